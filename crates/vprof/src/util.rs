use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock timestamp in milliseconds since the epoch. A clock set before
/// the epoch reads as 0.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
