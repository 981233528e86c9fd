//! Notification text and attachment selection
//!
//! | Kind          | Title               | Attachment             |
//! |---------------|---------------------|------------------------|
//! | NewDetection  | `{label} Detected`  | clip, else snapshot    |
//! | ZoneEntry     | `{label} Zone Entry`| snapshot only          |
//! | LeftView      | `{label} Left View` | clip, else snapshot    |
//!
//! A payload is built even when no media is available.

use crate::domain::decision::NotifyKind;
use crate::domain::notification::{Attachment, MediaKind, NotificationPayload};
use crate::domain::types::{Event, Media};

pub fn compose(kind: &NotifyKind, event: &Event) -> NotificationPayload {
    let (title, body, media) = match kind {
        NotifyKind::NewDetection { label, zones } => (
            format!("{label} Detected"),
            format!(
                "New {label} Detected with {:.1}% certainty in {}",
                event.score,
                zones.join(", ")
            ),
            prefer_clip(event.media),
        ),
        NotifyKind::ZoneEntry { label, entered } => (
            format!("{label} Zone Entry"),
            format!("{label} entered zones: {}", entered.join(", ")),
            event.media.has_snapshot.then_some(MediaKind::Snapshot),
        ),
        NotifyKind::LeftView { label } => (
            format!("{label} Left View"),
            format!("{label} left view"),
            prefer_clip(event.media),
        ),
    };

    NotificationPayload {
        title,
        body,
        attachment: media.map(|kind| Attachment { object_id: event.object_id.clone(), kind }),
    }
}

fn prefer_clip(media: Media) -> Option<MediaKind> {
    if media.has_clip {
        Some(MediaKind::Clip)
    } else if media.has_snapshot {
        Some(MediaKind::Snapshot)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EventKind, ObjectId};

    fn person(kind: EventKind, media: Media) -> Event {
        Event {
            kind,
            object_id: ObjectId::from("1"),
            label: Some("person".to_string()),
            score: 92.0,
            zones: vec!["yard".to_string()],
            media,
        }
    }

    fn media(has_snapshot: bool, has_clip: bool) -> Media {
        Media { has_snapshot, has_clip }
    }

    fn attachment_kind(payload: &NotificationPayload) -> Option<MediaKind> {
        payload.attachment.as_ref().map(|a| a.kind)
    }

    #[test]
    fn test_new_detection_text() {
        let event = person(EventKind::New, media(false, true));
        let kind = NotifyKind::NewDetection {
            label: "Person".into(),
            zones: vec!["yard".into(), "porch".into()],
        };
        let payload = compose(&kind, &event);

        assert_eq!(payload.title, "Person Detected");
        assert_eq!(payload.body, "New Person Detected with 92.0% certainty in yard, porch");
        assert_eq!(
            payload.attachment,
            Some(Attachment { object_id: ObjectId::from("1"), kind: MediaKind::Clip })
        );
    }

    #[test]
    fn test_score_rounded_to_one_decimal() {
        let mut event = person(EventKind::New, Media::default());
        event.score = 87.654;
        let kind = NotifyKind::NewDetection { label: "Person".into(), zones: vec![] };
        let payload = compose(&kind, &event);
        assert_eq!(payload.body, "New Person Detected with 87.7% certainty in ");
    }

    #[test]
    fn test_new_detection_attachment_preference() {
        let kind = NotifyKind::NewDetection { label: "Person".into(), zones: vec!["yard".into()] };

        let payload = compose(&kind, &person(EventKind::New, media(true, true)));
        assert_eq!(attachment_kind(&payload), Some(MediaKind::Clip));

        let payload = compose(&kind, &person(EventKind::New, media(true, false)));
        assert_eq!(attachment_kind(&payload), Some(MediaKind::Snapshot));

        // Text-only is still a notification
        let payload = compose(&kind, &person(EventKind::New, media(false, false)));
        assert_eq!(attachment_kind(&payload), None);
        assert_eq!(payload.title, "Person Detected");
    }

    #[test]
    fn test_zone_entry_never_attaches_clip() {
        let kind = NotifyKind::ZoneEntry {
            label: "Person".into(),
            entered: vec!["porch".into(), "door".into()],
        };

        let payload = compose(&kind, &person(EventKind::Update, media(false, true)));
        assert_eq!(payload.title, "Person Zone Entry");
        assert_eq!(payload.body, "Person entered zones: porch, door");
        assert_eq!(attachment_kind(&payload), None);

        let payload = compose(&kind, &person(EventKind::Update, media(true, true)));
        assert_eq!(attachment_kind(&payload), Some(MediaKind::Snapshot));
    }

    #[test]
    fn test_label_comes_from_decision() {
        let kind = NotifyKind::LeftView { label: "Car".into() };
        let payload = compose(&kind, &person(EventKind::End, Media::default()));
        assert_eq!(payload.title, "Car Left View");
        assert_eq!(payload.body, "Car left view");
    }

    #[test]
    fn test_left_view() {
        let kind = NotifyKind::LeftView { label: "Person".into() };
        let payload = compose(&kind, &person(EventKind::End, media(true, false)));
        assert_eq!(payload.title, "Person Left View");
        assert_eq!(payload.body, "Person left view");
        assert_eq!(attachment_kind(&payload), Some(MediaKind::Snapshot));

        let payload = compose(&kind, &person(EventKind::End, media(true, true)));
        assert_eq!(attachment_kind(&payload), Some(MediaKind::Clip));
    }
}
