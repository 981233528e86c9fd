//! Push notification payload handed to the outbound sender

use crate::domain::types::ObjectId;

/// Title used for the notifier's own status messages
pub const STATUS_TITLE: &str = "Frigate MQTT Notifier";

/// Media file Frigate serves for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Snapshot,
    Clip,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Snapshot => "snapshot",
            MediaKind::Clip => "clip",
        }
    }
}

/// Reference to an event's media; the sender turns it into a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub object_id: ObjectId,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl NotificationPayload {
    /// Text-only status message about the notifier itself
    pub fn status(body: impl Into<String>) -> Self {
        Self { title: STATUS_TITLE.to_string(), body: body.into(), attachment: None }
    }
}
