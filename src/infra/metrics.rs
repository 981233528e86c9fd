//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics so the MQTT receive loop and the notification worker can
//! record without locking each other. Reporting swaps the periodic counters.
//!
//! NOTE: All atomics use Relaxed ordering. These are statistical counters
//! only; do not use them for coordination or logic decisions.

use crate::domain::decision::SkipReason;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

pub struct Metrics {
    /// MQTT messages received on the events topic (monotonic)
    messages_total: AtomicU64,
    /// Messages received since last report (reset on report)
    messages_since_report: AtomicU64,
    /// Messages dropped by the throttle (monotonic)
    throttled_total: AtomicU64,
    /// Messages that failed to parse (monotonic)
    decode_errors_total: AtomicU64,
    skipped_duplicate_new: AtomicU64,
    skipped_no_zone_change: AtomicU64,
    skipped_stationary: AtomicU64,
    skipped_unknown_type: AtomicU64,
    /// Notifications handed to the worker queue (monotonic)
    notifications_queued: AtomicU64,
    /// Notifications dropped because the queue was full (monotonic)
    notifications_dropped: AtomicU64,
    /// Notifications delivered (monotonic)
    notifications_sent: AtomicU64,
    /// Notifications that failed after all retries (monotonic)
    notifications_failed: AtomicU64,
    /// Sum of send latencies since last report (reset on report)
    send_latency_sum_us: AtomicU64,
    /// Max send latency since last report (reset on report)
    send_latency_max_us: AtomicU64,
    /// Sends since last report (reset on report)
    sends_since_report: AtomicU64,
    /// Object ids currently held by the state tracker (gauge)
    tracked_objects: AtomicU64,
    /// Current notification queue depth (gauge)
    notify_queue_depth: AtomicU64,
    last_report_time: Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            messages_total: AtomicU64::new(0),
            messages_since_report: AtomicU64::new(0),
            throttled_total: AtomicU64::new(0),
            decode_errors_total: AtomicU64::new(0),
            skipped_duplicate_new: AtomicU64::new(0),
            skipped_no_zone_change: AtomicU64::new(0),
            skipped_stationary: AtomicU64::new(0),
            skipped_unknown_type: AtomicU64::new(0),
            notifications_queued: AtomicU64::new(0),
            notifications_dropped: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            send_latency_sum_us: AtomicU64::new(0),
            send_latency_max_us: AtomicU64::new(0),
            sends_since_report: AtomicU64::new(0),
            tracked_objects: AtomicU64::new(0),
            notify_queue_depth: AtomicU64::new(0),
            last_report_time: Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_message_received(&self) {
        self.messages_total.fetch_add(1, Ordering::Relaxed);
        self.messages_since_report.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_throttled(&self) {
        self.throttled_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decode_error(&self) {
        self.decode_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_skip(&self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::DuplicateNew => &self.skipped_duplicate_new,
            SkipReason::NoZoneChange => &self.skipped_no_zone_change,
            SkipReason::Stationary => &self.skipped_stationary,
            SkipReason::UnknownType => &self.skipped_unknown_type,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_notification_queued(&self) {
        self.notifications_queued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_notification_dropped(&self) {
        self.notifications_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered notification with its send latency
    pub fn record_notification_sent(&self, latency_us: u64) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        self.sends_since_report.fetch_add(1, Ordering::Relaxed);
        self.send_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.send_latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_notification_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_tracked_objects(&self, count: usize) {
        self.tracked_objects.store(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_notify_queue_depth(&self, depth: u64) {
        self.notify_queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn messages_total(&self) -> u64 {
        self.messages_total.load(Ordering::Relaxed)
    }

    pub fn throttled_total(&self) -> u64 {
        self.throttled_total.load(Ordering::Relaxed)
    }

    pub fn decode_errors_total(&self) -> u64 {
        self.decode_errors_total.load(Ordering::Relaxed)
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped_duplicate_new.load(Ordering::Relaxed)
            + self.skipped_no_zone_change.load(Ordering::Relaxed)
            + self.skipped_stationary.load(Ordering::Relaxed)
            + self.skipped_unknown_type.load(Ordering::Relaxed)
    }

    pub fn notifications_queued(&self) -> u64 {
        self.notifications_queued.load(Ordering::Relaxed)
    }

    pub fn notifications_dropped(&self) -> u64 {
        self.notifications_dropped.load(Ordering::Relaxed)
    }

    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    pub fn notifications_failed(&self) -> u64 {
        self.notifications_failed.load(Ordering::Relaxed)
    }

    pub fn tracked_objects(&self) -> u64 {
        self.tracked_objects.load(Ordering::Relaxed)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self) -> MetricsSummary {
        let messages_count = self.messages_since_report.swap(0, Ordering::Relaxed);
        let send_count = self.sends_since_report.swap(0, Ordering::Relaxed);
        let send_latency_sum = self.send_latency_sum_us.swap(0, Ordering::Relaxed);
        let send_latency_max = self.send_latency_max_us.swap(0, Ordering::Relaxed);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let messages_per_sec = if elapsed.as_secs_f64() > 0.0 {
            messages_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            messages_total: self.messages_total(),
            messages_per_sec,
            throttled_total: self.throttled_total(),
            decode_errors_total: self.decode_errors_total(),
            skipped_total: self.skipped_total(),
            notifications_queued: self.notifications_queued(),
            notifications_sent: self.notifications_sent(),
            notifications_failed: self.notifications_failed(),
            notifications_dropped: self.notifications_dropped(),
            send_latency_avg_us: if send_count > 0 { send_latency_sum / send_count } else { 0 },
            send_latency_max_us: send_latency_max,
            tracked_objects: self.tracked_objects(),
            notify_queue_depth: self.notify_queue_depth.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub messages_total: u64,
    pub messages_per_sec: f64,
    pub throttled_total: u64,
    pub decode_errors_total: u64,
    pub skipped_total: u64,
    pub notifications_queued: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub notifications_dropped: u64,
    pub send_latency_avg_us: u64,
    pub send_latency_max_us: u64,
    pub tracked_objects: u64,
    pub notify_queue_depth: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            messages_total = %self.messages_total,
            messages_per_sec = format!("{:.2}", self.messages_per_sec),
            throttled = %self.throttled_total,
            decode_errors = %self.decode_errors_total,
            skipped = %self.skipped_total,
            queued = %self.notifications_queued,
            sent = %self.notifications_sent,
            failed = %self.notifications_failed,
            dropped = %self.notifications_dropped,
            send_avg_us = %self.send_latency_avg_us,
            send_max_us = %self.send_latency_max_us,
            tracked_objects = %self.tracked_objects,
            queue_depth = %self.notify_queue_depth,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.messages_total(), 0);
        assert_eq!(metrics.notifications_sent(), 0);
    }

    #[test]
    fn test_skip_counters() {
        let metrics = Metrics::new();
        metrics.record_skip(SkipReason::DuplicateNew);
        metrics.record_skip(SkipReason::Stationary);
        metrics.record_skip(SkipReason::Stationary);
        assert_eq!(metrics.skipped_total(), 3);
        assert_eq!(metrics.skipped_stationary.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_report() {
        let metrics = Metrics::new();

        metrics.record_message_received();
        metrics.record_message_received();
        metrics.record_notification_sent(100);
        metrics.record_notification_sent(300);
        metrics.set_tracked_objects(4);

        let summary = metrics.report();

        assert_eq!(summary.messages_total, 2);
        assert_eq!(summary.notifications_sent, 2);
        assert_eq!(summary.send_latency_avg_us, 200);
        assert_eq!(summary.send_latency_max_us, 300);
        assert_eq!(summary.tracked_objects, 4);

        // Periodic counters should be reset, monotonic ones kept
        assert_eq!(metrics.messages_since_report.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.send_latency_sum_us.load(Ordering::Relaxed), 0);
        let summary = metrics.report();
        assert_eq!(summary.messages_total, 2);
        assert_eq!(summary.send_latency_avg_us, 0);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(Metrics::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for i in 0..1000 {
                    m.record_message_received();
                    m.record_notification_sent(i);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(metrics.messages_total(), 4000);
        assert_eq!(metrics.notifications_sent(), 4000);
        assert_eq!(metrics.send_latency_max_us.load(Ordering::Relaxed), 999);
    }
}
