//! Backoff delays.
//!
//! Two schedules live here: the single fixed recovery step taken before a
//! fallback, and the jittered schedule used between provider transport retries.

use std::time::Duration;
use rand::Rng;

/// Delay before a recovery attempt: `min(base * 2^attempt, max)`, no jitter.
pub fn recovery_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(max_ms))
}

/// Exponential backoff with up to 10% jitter for transport retries.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_delay_single_step() {
        assert_eq!(recovery_delay(1, 1_000, 10_000), Duration::from_millis(2_000));
        assert_eq!(recovery_delay(3, 1_000, 10_000), Duration::from_millis(8_000));
        assert_eq!(recovery_delay(4, 1_000, 10_000), Duration::from_millis(10_000));
        assert_eq!(recovery_delay(64, 1_000, 10_000), Duration::from_millis(10_000));
    }

    #[test]
    fn test_transport_backoff_bounds() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);

        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 110);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000 && max.as_millis() < 1100);
    }
}
