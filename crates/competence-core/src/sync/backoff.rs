//! Retry delay computation for failed flushes.

use std::time::Duration;

use competence_types::config::SyncConfig;

/// Delay before the next attempt after `retry_count` consecutive failures.
///
/// `min(retry_max_ms, retry_base_ms * 2^min(retry_count, retry_max_exponent))`.
/// With the default config: 600, 1200, 2400, 4800, 9600, 9600, ...
pub fn retry_delay(config: &SyncConfig, retry_count: u32) -> Duration {
    let exponent = retry_count.min(config.retry_max_exponent);
    let millis = config
        .retry_base_ms
        .saturating_mul(2u64.saturating_pow(exponent))
        .min(config.retry_max_ms);
    Duration::from_millis(millis)
}
