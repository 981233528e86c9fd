//! Shared types for the Frigate notifier

use serde::{Deserialize, Deserializer};

/// Newtype wrapper for Frigate tracked-object ids
///
/// Frigate keeps the same id for an object across its `new`, `update` and
/// `end` events, so this is the key for all per-object state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId(s.to_string())
    }
}

/// Frigate event message structure for parsing (`frigate/events`)
#[derive(Debug, Deserialize)]
pub struct FrigateMessage {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    /// Object state after the change; `null` is treated like a missing field
    #[serde(default)]
    pub after: Option<EventAttributes>,
}

/// Subset of Frigate's `after` object that drives notifications.
/// All other fields Frigate sends (camera, box, region, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct EventAttributes {
    /// Object id - Frigate sends a string, but numbers are accepted too
    #[serde(default, deserialize_with = "deserialize_object_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// Certainty in 0..1
    #[serde(default)]
    pub top_score: Option<f64>,
    #[serde(default)]
    pub current_zones: Option<Vec<String>>,
    /// Any truthy JSON value counts (`true`, `1`, `"yes"`, ...)
    #[serde(default, deserialize_with = "deserialize_truthy")]
    pub stationary: Option<bool>,
    #[serde(default)]
    pub has_snapshot: Option<bool>,
    #[serde(default)]
    pub has_clip: Option<bool>,
}

fn deserialize_object_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct ObjectIdVisitor;

    impl<'de> Visitor<'de> for ObjectIdVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or numeric object id")
        }

        fn visit_str<E>(self, value: &str) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            // Keep the JSON spelling: 1.0 stays "1.0", not "1"
            let text = serde_json::Number::from_f64(value)
                .map(|n| n.to_string())
                .unwrap_or_else(|| value.to_string());
            Ok(Some(text))
        }

        fn visit_unit<E>(self) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Option<String>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(ObjectIdVisitor)
}

fn deserialize_truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }))
}

/// Lifecycle stage reported by Frigate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    New,
    Update,
    End,
    Other(String),
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "new" => EventKind::New,
            "update" => EventKind::Update,
            "end" => EventKind::End,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventKind::from(s))
    }
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::New => "new",
            EventKind::Update => "update",
            EventKind::End => "end",
            EventKind::Other(s) => s,
        }
    }
}

/// Which media Frigate has recorded for an object so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Media {
    pub has_snapshot: bool,
    pub has_clip: bool,
}

/// Parsed event for internal processing
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// Never empty
    pub object_id: ObjectId,
    /// Display label, first letter upper-cased ("person" -> "Person").
    /// None when the message carried no label.
    pub label: Option<String>,
    /// Certainty as a percentage (0..100)
    pub score: f64,
    /// Zones the object is in at event time, in Frigate's order
    pub zones: Vec<String>,
    pub media: Media,
}
