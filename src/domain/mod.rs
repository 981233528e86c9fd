//! Domain models - Frigate events, decisions and notification payloads
//!
//! This module contains the canonical data types used throughout the system:
//! - `Event` - one parsed lifecycle event for a tracked object
//! - `Decision` - whether an event is skipped or notified, and why
//! - `NotificationPayload` - title/body/attachment handed to the sender

pub mod decision;
pub mod notification;
pub mod types;

pub use decision::{Decision, NotifyKind, SkipReason};
pub use notification::{Attachment, MediaKind, NotificationPayload};
pub use types::{Event, EventKind, Media, ObjectId};
