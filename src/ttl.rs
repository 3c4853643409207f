//! Cache lifetime policy driven by recent hit counts.

use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Pick how long a resolved URL stays cached, given how often its code was
/// served from cache in the last hour and the last day.
///
/// Rules are checked top-down and the first match wins.
pub fn ttl_for_hits(hits_1h: i64, hits_24h: i64) -> Duration {
    let secs = if hits_1h >= 100 {
        3 * HOUR
    } else if hits_1h >= 20 {
        HOUR
    } else if hits_1h >= 5 {
        30 * MINUTE
    } else if hits_24h >= 50 {
        15 * MINUTE
    } else if hits_24h >= 10 {
        10 * MINUTE
    } else {
        5 * MINUTE
    };
    Duration::from_secs(secs)
}
