//! Services - event interpretation and notification delivery
//!
//! This module contains the core logic:
//! - `throttle` - Global minimum gap between processed messages
//! - `parser` - Raw payload to `Event`
//! - `state_tracker` - Per-object seen/zone state and the notify/skip decision
//! - `composer` - Notification title, body and attachment
//! - `pipeline` - The four steps above, one message at a time
//! - `notify_worker` - Queue and worker that deliver notifications

pub mod composer;
pub mod notify_worker;
pub mod parser;
pub mod pipeline;
pub mod state_tracker;
pub mod throttle;

// Re-export commonly used types
pub use notify_worker::{create_notify_worker, NotifySender, NotifyWorker, RetryPolicy};
pub use pipeline::Pipeline;
pub use state_tracker::{EventStateTracker, EvictionPolicy};
pub use throttle::EventThrottle;
