//! Message pipeline: throttle -> parse -> state decision -> compose
//!
//! `process_message` is synchronous and owns all mutable state, so the
//! caller must feed messages one at a time in arrival order.

use crate::domain::decision::{Decision, SkipReason};
use crate::domain::notification::NotificationPayload;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::composer::compose;
use crate::services::parser::{parse_event, ParseError, ParseOutcome};
use crate::services::state_tracker::EventStateTracker;
use crate::services::throttle::EventThrottle;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct Pipeline {
    throttle: EventThrottle,
    tracker: EventStateTracker,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(throttle: EventThrottle, tracker: EventStateTracker, metrics: Arc<Metrics>) -> Self {
        Self { throttle, tracker, metrics }
    }

    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> Self {
        Self::new(
            EventThrottle::from_secs_f64(config.message_timeout_secs()),
            EventStateTracker::new(config.state_eviction()),
            metrics,
        )
    }

    pub fn tracker(&self) -> &EventStateTracker {
        &self.tracker
    }

    /// Process one raw message received at `now`.
    ///
    /// Returns the notification to send, or None when the message was
    /// throttled, malformed, or skipped. State changes made here are never
    /// rolled back, whatever happens to the returned payload.
    pub fn process_message(&mut self, raw: &[u8], now: Instant) -> Option<NotificationPayload> {
        self.metrics.record_message_received();

        if !self.throttle.should_process(now) {
            self.metrics.record_throttled();
            debug!("event_throttled");
            return None;
        }

        let event = match parse_event(raw) {
            Ok(ParseOutcome::Event(event)) => event,
            Ok(ParseOutcome::Skip(reason)) => {
                self.record_skip(reason, None);
                return None;
            }
            Err(e) => {
                self.metrics.record_decode_error();
                log_decode_error(&e);
                return None;
            }
        };

        debug!(
            object_id = %event.object_id,
            event_type = %event.kind.as_str(),
            label = ?event.label,
            zones = %event.zones.join(", "),
            "event_received"
        );

        let decision = self.tracker.decide(&event, now);
        self.metrics.set_tracked_objects(self.tracker.tracked_objects());

        match decision {
            Decision::Skip(reason) => {
                self.record_skip(reason, Some(event.object_id.as_str()));
                None
            }
            Decision::Notify(kind) => {
                let payload = compose(&kind, &event);
                debug!(
                    object_id = %event.object_id,
                    kind = %kind.as_str(),
                    title = %payload.title,
                    attachment = ?payload.attachment.as_ref().map(|a| a.kind.as_str()),
                    "notification_composed"
                );
                Some(payload)
            }
        }
    }

    fn record_skip(&self, reason: SkipReason, object_id: Option<&str>) {
        self.metrics.record_skip(reason);
        debug!(reason = %reason.as_str(), object_id = ?object_id, "event_skipped");
    }
}

#[cold]
fn log_decode_error(e: &ParseError) {
    warn!(error = %e, "invalid_event_payload");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::MediaKind;
    use crate::services::state_tracker::EvictionPolicy;
    use std::time::Duration;

    fn pipeline(window_ms: u64) -> (Pipeline, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        let pipeline = Pipeline::new(
            EventThrottle::new(Duration::from_millis(window_ms)),
            EventStateTracker::new(EvictionPolicy::Never),
            metrics.clone(),
        );
        (pipeline, metrics)
    }

    const NEW_PERSON: &[u8] = br#"{"type":"new","after":{"id":"1","label":"person",
        "top_score":0.92,"current_zones":["yard"],"has_clip":true}}"#;

    #[test]
    fn test_throttled_message_is_not_parsed() {
        let (mut pipeline, metrics) = pipeline(1000);
        let t0 = Instant::now();

        assert!(pipeline.process_message(NEW_PERSON, t0).is_some());
        // Same message inside the window: dropped before parsing
        assert!(pipeline.process_message(b"garbage", t0 + Duration::from_millis(500)).is_none());
        assert_eq!(metrics.throttled_total(), 1);
        assert_eq!(metrics.decode_errors_total(), 0);
    }

    #[test]
    fn test_malformed_message_consumes_throttle_window() {
        let (mut pipeline, metrics) = pipeline(1000);
        let t0 = Instant::now();

        assert!(pipeline.process_message(b"{not json", t0).is_none());
        assert_eq!(metrics.decode_errors_total(), 1);

        assert!(pipeline.process_message(NEW_PERSON, t0 + Duration::from_millis(200)).is_none());
        assert_eq!(metrics.throttled_total(), 1);
        assert_eq!(pipeline.tracker().tracked_objects(), 0);
    }

    #[test]
    fn test_pipeline_continues_after_malformed_message() {
        let (mut pipeline, _) = pipeline(0);
        let now = Instant::now();

        assert!(pipeline.process_message(b"\xff\xfe", now).is_none());
        let payload = pipeline.process_message(NEW_PERSON, now).unwrap();
        assert_eq!(payload.title, "Person Detected");
        assert_eq!(payload.attachment.unwrap().kind, MediaKind::Clip);
    }

    #[test]
    fn test_stationary_does_not_mutate_state() {
        let (mut pipeline, metrics) = pipeline(0);
        let now = Instant::now();

        let stationary = br#"{"type":"new","after":{"id":"1","stationary":true}}"#;
        assert!(pipeline.process_message(stationary, now).is_none());
        assert_eq!(pipeline.tracker().tracked_objects(), 0);
        assert_eq!(metrics.skipped_total(), 1);

        // The later non-stationary `new` is still the first one
        assert!(pipeline.process_message(NEW_PERSON, now).is_some());
    }

    #[test]
    fn test_tracked_objects_gauge() {
        let (mut pipeline, metrics) = pipeline(0);
        let now = Instant::now();

        pipeline.process_message(NEW_PERSON, now);
        pipeline.process_message(br#"{"type":"update","after":{"id":"2"}}"#, now);
        assert_eq!(metrics.tracked_objects(), 2);
    }
}
