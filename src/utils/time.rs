use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current time in milliseconds since UNIX epoch
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Time elapsed since a millisecond timestamp, zero if it lies in the future
pub fn elapsed_since(timestamp_millis: u64) -> Duration {
    Duration::from_millis(current_time_millis().saturating_sub(timestamp_millis))
}
