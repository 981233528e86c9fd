//! Frigate event parser
//!
//! Turns a raw `frigate/events` payload into an [`Event`]. Stationary objects
//! are reported as a skip rather than an event so they never touch state.

use crate::domain::decision::SkipReason;
use crate::domain::types::{Event, EventKind, FrigateMessage, Media, ObjectId};
use serde_json::error::Category;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// Payload is not JSON at all (syntax error, truncated, bad UTF-8)
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// Valid JSON with unexpected field types
    #[error("unexpected event shape: {0}")]
    InvalidShape(#[source] serde_json::Error),
    #[error("event has no object id")]
    MissingObjectId,
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            Category::Data => ParseError::InvalidShape(e),
            Category::Io | Category::Syntax | Category::Eof => ParseError::InvalidJson(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Event(Event),
    Skip(SkipReason),
}

/// Parse a raw MQTT payload
pub fn parse_event(raw: &[u8]) -> Result<ParseOutcome, ParseError> {
    let message: FrigateMessage = serde_json::from_slice(raw)?;
    let attrs = message.after.unwrap_or_default();

    if attrs.stationary.unwrap_or(false) {
        return Ok(ParseOutcome::Skip(SkipReason::Stationary));
    }

    let object_id = match attrs.id {
        Some(id) if !id.is_empty() => ObjectId(id),
        _ => return Err(ParseError::MissingObjectId),
    };

    let kind = EventKind::from(message.event_type.as_deref().unwrap_or_default());

    // Missing labels are filled in later from the object's earlier events
    let label = attrs.label.as_deref().filter(|l| !l.is_empty()).map(capitalize);

    Ok(ParseOutcome::Event(Event {
        kind,
        object_id,
        label,
        score: attrs.top_score.unwrap_or(0.0) * 100.0,
        zones: attrs.current_zones.unwrap_or_default(),
        media: Media {
            has_snapshot: attrs.has_snapshot.unwrap_or(false),
            has_clip: attrs.has_clip.unwrap_or(false),
        },
    }))
}

/// Upper-case the first character, leave the rest as sent
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(json: &str) -> Event {
        match parse_event(json.as_bytes()) {
            Ok(ParseOutcome::Event(event)) => event,
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_new_event() {
        let event = parse_ok(
            r#"{"type":"new","after":{"id":"1","label":"person","top_score":0.92,
                "current_zones":["yard"],"has_clip":true}}"#,
        );

        assert_eq!(event.kind, EventKind::New);
        assert_eq!(event.object_id, ObjectId::from("1"));
        assert_eq!(event.label.as_deref(), Some("Person"));
        assert!((event.score - 92.0).abs() < 1e-9);
        assert_eq!(event.zones, vec!["yard".to_string()]);
        assert!(event.media.has_clip);
        assert!(!event.media.has_snapshot);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let event = parse_ok(r#"{"type":"update","after":{"id":"abc"}}"#);
        assert!(event.label.is_none());
        assert_eq!(event.score, 0.0);
        assert!(event.zones.is_empty());
        assert_eq!(event.media, Media::default());
    }

    #[test]
    fn test_label_only_first_letter_capitalized() {
        let event = parse_ok(r#"{"type":"new","after":{"id":"1","label":"license_plate"}}"#);
        assert_eq!(event.label.as_deref(), Some("License_plate"));

        let event = parse_ok(r#"{"type":"new","after":{"id":"1","label":"dOG"}}"#);
        assert_eq!(event.label.as_deref(), Some("DOG"));
    }

    #[test]
    fn test_stationary_skipped() {
        let outcome =
            parse_event(br#"{"type":"update","after":{"id":"1","stationary":true}}"#).unwrap();
        assert_eq!(outcome, ParseOutcome::Skip(SkipReason::Stationary));
    }

    #[test]
    fn test_stationary_false_is_parsed() {
        let event = parse_ok(r#"{"type":"update","after":{"id":"1","stationary":false}}"#);
        assert_eq!(event.kind, EventKind::Update);
    }

    #[test]
    fn test_truthy_stationary_skipped() {
        for value in ["1", "\"true\"", "[0]"] {
            let json = format!(r#"{{"type":"update","after":{{"id":"1","stationary":{}}}}}"#, value);
            assert_eq!(
                parse_event(json.as_bytes()).unwrap(),
                ParseOutcome::Skip(SkipReason::Stationary)
            );
        }
        let event = parse_ok(r#"{"type":"update","after":{"id":"1","stationary":0}}"#);
        assert_eq!(event.object_id, ObjectId::from("1"));
    }

    #[test]
    fn test_empty_label_treated_as_missing() {
        let event = parse_ok(r#"{"type":"new","after":{"id":"1","label":""}}"#);
        assert!(event.label.is_none());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_event(b"not json"), Err(ParseError::InvalidJson(_))));
        assert!(matches!(parse_event(b"{\"type\":"), Err(ParseError::InvalidJson(_))));
        assert!(matches!(parse_event(b""), Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn test_wrong_shape() {
        assert!(matches!(parse_event(b"[1,2,3]"), Err(ParseError::InvalidShape(_))));
        assert!(matches!(
            parse_event(br#"{"type":"new","after":{"id":"1","current_zones":"yard"}}"#),
            Err(ParseError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_missing_object_id() {
        assert!(matches!(
            parse_event(br#"{"type":"new","after":{"label":"person"}}"#),
            Err(ParseError::MissingObjectId)
        ));
        assert!(matches!(
            parse_event(br#"{"type":"new","after":{"id":""}}"#),
            Err(ParseError::MissingObjectId)
        ));
        assert!(matches!(parse_event(br#"{"type":"end"}"#), Err(ParseError::MissingObjectId)));
    }

    #[test]
    fn test_unknown_and_missing_type() {
        let event = parse_ok(r#"{"type":"snapshot","after":{"id":"1"}}"#);
        assert_eq!(event.kind, EventKind::Other("snapshot".to_string()));

        let event = parse_ok(r#"{"after":{"id":"1"}}"#);
        assert!(matches!(event.kind, EventKind::Other(_)));
    }

    #[test]
    fn test_extra_frigate_fields_ignored() {
        let event = parse_ok(
            r#"{"type":"end","before":{"id":"1"},"after":{"id":"1","camera":"front",
                "label":"car","box":[1,2,3,4],"has_snapshot":true}}"#,
        );
        assert_eq!(event.kind, EventKind::End);
        assert_eq!(event.label.as_deref(), Some("Car"));
        assert!(event.media.has_snapshot);
    }
}
