//! Health monitor: outcome bookkeeping and the periodic monitoring tick.
//!
//! # Responsibilities
//! - Record successes, failures, recoveries and critical alerts
//! - Keep bounded response-time and memory windows
//! - Decay component error rates and sample memory on every tick
//! - Produce `HealthReport` snapshots (copies, never live references)

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::clock::Clock;
use crate::config::MonitoringConfig;
use crate::health::memory::MemorySampler;
use crate::health::state::{evaluate_status, ComponentHealth, OverallStatus};
use crate::health::window::SampleWindow;
use crate::observability::metrics;

/// Failure counters. Only ever grow; no reset short of a new monitor.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMetrics {
    pub total: u64,
    pub by_kind: BTreeMap<String, u64>,
    pub by_component: BTreeMap<String, u64>,
    pub recovery_success: u64,
    pub critical_errors: u64,
}

impl ErrorMetrics {
    /// `total / (total + recovery_success)`, 0 when both are 0.
    pub fn error_rate(&self) -> f64 {
        let denominator = self.total + self.recovery_success;
        if denominator == 0 {
            0.0
        } else {
            self.total as f64 / denominator as f64
        }
    }

    /// `recovery_success / total`, 1 when there were no errors.
    pub fn recovery_success_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.recovery_success as f64 / self.total as f64
        }
    }
}

#[derive(Debug)]
struct PerformanceMetrics {
    response_times: SampleWindow,
    memory_usage: SampleWindow,
    cache_hit_rate: f64,
    /// Completed operations per minute over the last tick.
    throughput: f64,
}

#[derive(Debug)]
struct MonitorState {
    errors: ErrorMetrics,
    performance: PerformanceMetrics,
    components: HashMap<String, ComponentHealth>,
    status: OverallStatus,
    last_check: DateTime<Utc>,
    last_tick: Instant,
}

/// Aggregate numbers included in every report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetrics {
    pub avg_response_time: f64,
    pub error_rate: f64,
    #[serde(rename = "memoryUsageMB")]
    pub memory_usage_mb: f64,
    pub cache_hit_rate: f64,
    pub total_errors: u64,
    pub recovery_success_rate: f64,
    pub critical_errors: u64,
    pub errors_by_kind: BTreeMap<String, u64>,
    pub errors_by_component: BTreeMap<String, u64>,
    pub throughput: f64,
    pub concurrent_connections: usize,
}

/// Point-in-time health snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: OverallStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    pub last_check: DateTime<Utc>,
    /// Milliseconds since the monitor was created.
    pub uptime: u64,
    pub metrics: ReportMetrics,
}

impl HealthReport {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "status={:?} uptime={}min avg={}ms errors={:.2}% memory={}MB cache={:.1}% recovery={:.1}%",
            self.status,
            self.uptime / 1000 / 60,
            self.metrics.avg_response_time.round(),
            self.metrics.error_rate * 100.0,
            self.metrics.memory_usage_mb.round(),
            self.metrics.cache_hit_rate * 100.0,
            self.metrics.recovery_success_rate * 100.0,
        )
    }
}

/// Decrements the in-flight count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct HealthMonitor {
    config: MonitoringConfig,
    clock: Arc<dyn Clock>,
    memory: Arc<dyn MemorySampler>,
    started: Instant,
    state: Mutex<MonitorState>,
    in_flight: Arc<AtomicUsize>,
    completed_since_tick: AtomicU64,
}

impl HealthMonitor {
    pub fn new(config: MonitoringConfig, clock: Arc<dyn Clock>, memory: Arc<dyn MemorySampler>) -> Self {
        let started = clock.now();
        let state = MonitorState {
            errors: ErrorMetrics::default(),
            performance: PerformanceMetrics {
                response_times: SampleWindow::new(config.response_time_samples),
                memory_usage: SampleWindow::new(config.memory_samples),
                cache_hit_rate: 0.0,
                throughput: 0.0,
            },
            components: HashMap::new(),
            status: OverallStatus::Healthy,
            last_check: clock.timestamp(),
            last_tick: started,
        };

        Self {
            config,
            clock,
            memory,
            started,
            state: Mutex::new(state),
            in_flight: Arc::new(AtomicUsize::new(0)),
            completed_since_tick: AtomicU64::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().expect("health monitor mutex poisoned")
    }

    /// Count an operation as in flight until the guard drops.
    pub fn track_connection(&self) -> ConnectionGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            counter: self.in_flight.clone(),
        }
    }

    pub fn record_success(&self, component: &str, response_time: Duration) {
        let ms = response_time.as_secs_f64() * 1000.0;
        let mut state = self.state();
        state.performance.response_times.push(ms);
        state
            .components
            .entry(component.to_string())
            .or_default()
            .mark_success(ms, self.config.error_rate_decay);
        drop(state);
        self.completed_since_tick.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failure under its kind and component.
    pub fn record_error(&self, component: &str, kind: &str, message: &str) {
        let mut state = self.state();
        state.errors.total += 1;
        *state.errors.by_kind.entry(kind.to_string()).or_insert(0) += 1;
        *state.errors.by_component.entry(component.to_string()).or_insert(0) += 1;
        state
            .components
            .entry(component.to_string())
            .or_default()
            .mark_error(message, self.config.error_rate_bump);
        drop(state);
        self.completed_since_tick.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_critical(&self) {
        self.state().errors.critical_errors += 1;
    }

    pub fn record_recovery(&self) {
        self.state().errors.recovery_success += 1;
    }

    /// Feed cache lookup totals into the hit rate.
    pub fn update_cache_metrics(&self, hits: u64, misses: u64) {
        let total = hits + misses;
        self.state().performance.cache_hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
    }

    pub fn error_metrics(&self) -> ErrorMetrics {
        self.state().errors.clone()
    }

    /// One monitoring pass: sample memory, decay error rates, re-evaluate status.
    pub fn tick(&self) -> OverallStatus {
        let memory = self.memory.sample_mb();
        let now = self.clock.now();
        let completed = self.completed_since_tick.swap(0, Ordering::Relaxed);

        let mut state = self.state();
        if let Some(mb) = memory {
            state.performance.memory_usage.push(mb);
        }

        let minutes = now.saturating_duration_since(state.last_tick).as_secs_f64() / 60.0;
        state.performance.throughput = if minutes > 0.0 { completed as f64 / minutes } else { 0.0 };
        state.last_tick = now;

        for health in state.components.values_mut() {
            health.decay(self.config.error_rate_decay);
        }

        let status = self.evaluate(&state);
        let previous = std::mem::replace(&mut state.status, status);
        state.last_check = self.clock.timestamp();

        let memory_mb = state.performance.memory_usage.latest();
        drop(state);

        if previous != status {
            tracing::warn!(from = ?previous, to = ?status, "Overall health status changed");
        }
        tracing::debug!(
            status = ?status,
            throughput = completed,
            summary = %self.report().summary(),
            "Performance metrics"
        );
        metrics::record_health_status(status, memory_mb);

        status
    }

    fn evaluate(&self, state: &MonitorState) -> OverallStatus {
        evaluate_status(
            state.performance.response_times.average(),
            state.errors.error_rate(),
            state.performance.memory_usage.latest(),
            &self.config,
        )
    }

    /// Current status from current averages.
    pub fn status(&self) -> OverallStatus {
        self.evaluate(&self.state())
    }

    pub fn report(&self) -> HealthReport {
        let uptime = self.clock.now().saturating_duration_since(self.started);
        let state = self.state();

        HealthReport {
            status: self.evaluate(&state),
            components: state.components.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            last_check: state.last_check,
            uptime: uptime.as_millis() as u64,
            metrics: ReportMetrics {
                avg_response_time: state.performance.response_times.average(),
                error_rate: state.errors.error_rate(),
                memory_usage_mb: state.performance.memory_usage.latest(),
                cache_hit_rate: state.performance.cache_hit_rate,
                total_errors: state.errors.total,
                recovery_success_rate: state.errors.recovery_success_rate(),
                critical_errors: state.errors.critical_errors,
                errors_by_kind: state.errors.by_kind.clone(),
                errors_by_component: state.errors.by_component.clone(),
                throughput: state.performance.throughput,
                concurrent_connections: self.in_flight.load(Ordering::Relaxed),
            },
        }
    }

    /// Log the human summary of the current report.
    pub fn log_metrics(&self) {
        let report = self.report();
        tracing::info!(status = ?report.status, summary = %report.summary(), "Performance metrics");
    }

    /// Tick on the configured interval until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let period = Duration::from_secs(self.config.interval_secs);
        tracing::info!(interval_secs = self.config.interval_secs, "Health monitor starting");

        // First tick one full period after start.
        let mut ticker = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, TokioClock};
    use crate::health::memory::FixedMemorySampler;
    use crate::health::state::ComponentStatus;

    fn monitor_with(memory_mb: f64) -> (Arc<ManualClock>, HealthMonitor) {
        let clock = Arc::new(ManualClock::new());
        let monitor = HealthMonitor::new(
            MonitoringConfig::default(),
            clock.clone(),
            Arc::new(FixedMemorySampler(memory_mb)),
        );
        (clock, monitor)
    }

    #[test]
    fn test_error_rate_formula() {
        let metrics = ErrorMetrics {
            total: 3,
            recovery_success: 7,
            ..Default::default()
        };
        assert!((metrics.error_rate() - 0.3).abs() < 1e-12);
        assert_eq!(ErrorMetrics::default().error_rate(), 0.0);
        assert_eq!(ErrorMetrics::default().recovery_success_rate(), 1.0);
    }

    #[test]
    fn test_slow_responses_degrade_then_critical() {
        let (_, monitor) = monitor_with(100.0);
        monitor.record_success("svc", Duration::from_millis(5_001));
        assert_eq!(monitor.status(), OverallStatus::Degraded);

        let (_, monitor) = monitor_with(100.0);
        monitor.record_success("svc", Duration::from_millis(15_001));
        assert_eq!(monitor.tick(), OverallStatus::Critical);
    }

    #[test]
    fn test_memory_window_capped_at_sixty() {
        let (clock, monitor) = monitor_with(600.0);
        for _ in 0..75 {
            clock.advance(Duration::from_secs(60));
            monitor.tick();
        }
        assert_eq!(monitor.state().performance.memory_usage.len(), 60);
        assert_eq!(monitor.report().status, OverallStatus::Degraded);
    }

    #[test]
    fn test_tick_decays_component_error_rate() {
        let (clock, monitor) = monitor_with(10.0);
        monitor.record_error("svc", "opaque", "boom");
        monitor.record_error("svc", "opaque", "boom");

        clock.advance(Duration::from_secs(60));
        monitor.tick();

        let report = monitor.report();
        let svc = &report.components["svc"];
        assert_eq!(svc.status, ComponentStatus::Error);
        assert!((svc.error_rate - 0.19).abs() < 1e-9);
        assert_eq!(svc.last_error.as_deref(), Some("boom"));
        assert_eq!(report.metrics.total_errors, 2);
        assert_eq!(report.metrics.errors_by_kind["opaque"], 2);
        assert_eq!(report.metrics.errors_by_component["svc"], 2);
        assert_eq!(report.metrics.throughput, 2.0);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tick_logs_metrics_summary() {
        let (clock, monitor) = monitor_with(42.0);
        monitor.update_cache_metrics(3, 1);

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        clock.advance(Duration::from_secs(60));
        tracing::subscriber::with_default(subscriber, || monitor.tick());

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let line = output
            .lines()
            .find(|l| l.contains("Performance metrics"))
            .unwrap();
        assert!(line.contains("DEBUG"));
        assert!(line.contains("memory=42MB"));
        assert!(line.contains("cache=75.0%"));
        assert!(line.contains("recovery=100.0%"));
    }

    #[test]
    fn test_report_counts_and_uptime() {
        let (clock, monitor) = monitor_with(10.0);
        monitor.record_error("svc", "retryable", "Connection timeout");
        monitor.record_recovery();
        monitor.record_critical();
        monitor.update_cache_metrics(3, 1);
        clock.advance(Duration::from_secs(5));

        let guard = monitor.track_connection();
        let report = monitor.report();
        assert_eq!(report.uptime, 5_000);
        assert_eq!(report.metrics.recovery_success_rate, 1.0);
        assert_eq!(report.metrics.error_rate, 0.5);
        assert_eq!(report.metrics.critical_errors, 1);
        assert_eq!(report.metrics.cache_hit_rate, 0.75);
        assert_eq!(report.metrics.concurrent_connections, 1);
        // 0.5 error rate is past the critical threshold.
        assert_eq!(report.status, OverallStatus::Critical);
        drop(guard);
        assert_eq!(monitor.report().metrics.concurrent_connections, 0);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let (_, monitor) = monitor_with(10.0);
        let json = serde_json::to_value(monitor.report()).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(json["metrics"]["memoryUsageMB"].is_number());
        assert!(json["metrics"]["recoverySuccessRate"].is_number());
        assert!(json["lastCheck"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_shutdown() {
        let monitor = Arc::new(HealthMonitor::new(
            MonitoringConfig::default(),
            Arc::new(TokioClock),
            Arc::new(FixedMemorySampler(42.0)),
        ));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(monitor.clone().run(rx));

        time::sleep(Duration::from_secs(150)).await;
        assert_eq!(monitor.state().performance.memory_usage.len(), 2);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
