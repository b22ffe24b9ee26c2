use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use resilience_gateway::admin::{self, admin_router};
use resilience_gateway::config::{load_or_default, ConfigWatcher};
use resilience_gateway::lifecycle::signals::spawn_signal_handler;
use resilience_gateway::observability::{logging::init_logging, metrics::init_metrics};
use resilience_gateway::{ResiliencePlatform, Shutdown};

#[derive(Parser)]
#[command(name = "resilience-gateway")]
#[command(about = "Resilience and integration gateway for business intelligence providers", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(&args.config)?;

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resilience-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let admin_config = config.admin.clone();
    let platform = Arc::new(ResiliencePlatform::new(config)?);

    let shutdown = Shutdown::new();
    let signals = spawn_signal_handler(shutdown.clone());
    let monitoring = platform.spawn_monitoring(shutdown.subscribe());

    let reload = match ConfigWatcher::new(&args.config) {
        Ok(mut watcher) => {
            let platform = platform.clone();
            let stopped = shutdown.wait();
            Some(tokio::spawn(async move {
                tokio::pin!(stopped);
                loop {
                    tokio::select! {
                        _ = &mut stopped => break,
                        next = watcher.next_config() => match next {
                            Some(config) => {
                                let changed = platform.apply_config(&config);
                                tracing::info!(?changed, "Provider settings reloaded");
                            }
                            None => break,
                        },
                    }
                }
            }))
        }
        Err(e) => {
            tracing::warn!(path = %args.config.display(), error = %e, "Config hot reload disabled");
            None
        }
    };

    if admin_config.enabled {
        let listener = TcpListener::bind(&admin_config.bind_address).await?;
        let router = admin_router(platform.clone(), &admin_config);
        admin::serve(listener, router, shutdown.wait()).await?;
    } else {
        shutdown.wait().await;
    }

    // The admin server can also stop on its own.
    shutdown.trigger();
    let _ = monitoring.await;
    if let Some(reload) = reload {
        let _ = reload.await;
    }
    signals.abort();

    platform.log_metrics();
    let report = platform.health_report();
    tracing::info!(status = ?report.status, summary = %report.summary(), "Shutdown complete");
    Ok(())
}
