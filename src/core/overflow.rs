//! Overflow reporting for bounded queues
//!
//! Overflow is never surfaced to producers. It is reported locally: a
//! rate-limited `tracing` warning plus an optional user callback.

use std::sync::Arc;

/// Callback type for overflow notifications
///
/// Called when entries are dropped because a queue is full. The parameter
/// is the total count of dropped entries so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Alert on the first drop and on every `ALERT_EVERY`th drop after that
pub(crate) const ALERT_EVERY: u64 = 1000;

/// Whether the drop that brought the total to `total_dropped` should alert
#[inline]
pub(crate) fn should_alert(total_dropped: u64) -> bool {
    total_dropped == 1 || total_dropped.is_multiple_of(ALERT_EVERY)
}

/// Emit the overflow diagnostic for `component` if this drop warrants it.
///
/// `previous` is the drop count before this drop, `count` the number of
/// entries dropped now.
pub(crate) fn report_overflow(
    component: &str,
    previous: u64,
    count: u64,
    callback: Option<&OverflowCallback>,
) {
    let total = previous + count;
    let crossed = (previous + 1..=total).any(should_alert);
    if !crossed {
        return;
    }

    tracing::warn!(
        component,
        dropped = total,
        "queue full, entries dropped; consider a larger capacity or a faster consumer"
    );

    if let Some(callback) = callback {
        callback(total);
    }
}
