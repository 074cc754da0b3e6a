//! Timeout helpers used across the crate.
//!
//! Keep these helpers minimal: they centralize the default hardware bring-up
//! deadlines and the bounded wait used by plugin initialization.

use std::time::Duration;

/// Deadline for the reader module to report power-up.
pub const DEFAULT_POWER_UP_TIMEOUT_MS: u64 = 3000;

/// Deadline for the vendor SDK to hand out a reader instance.
pub const DEFAULT_READER_INIT_TIMEOUT_MS: u64 = 10000;

/// Presence polling period of the detection loop.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 100;

/// Convert milliseconds to Duration.
pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Await `fut` for at most `limit`. The caller is released by whichever comes
/// first; on expiry the future is dropped and `Error::Timeout` names
/// `operation`.
#[cfg(feature = "async")]
pub async fn with_deadline<T, F>(operation: &'static str, limit: Duration, fut: F) -> crate::Result<T>
where
    F: std::future::Future<Output = crate::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(crate::Error::Timeout {
            operation,
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
