//! Outcome of interpreting one event against per-object state

/// Why an event produced no notification. These are expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A `new` event for an object that already had one
    DuplicateNew,
    /// An `update` that did not add any zone
    NoZoneChange,
    /// Frigate flagged the object as stationary
    Stationary,
    /// Event type other than new/update/end
    UnknownType,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::DuplicateNew => "duplicate_new",
            SkipReason::NoZoneChange => "no_zone_change",
            SkipReason::Stationary => "stationary",
            SkipReason::UnknownType => "unknown_type",
        }
    }
}

/// What kind of notification to build, with the display label resolved
/// from the event or the object's earlier events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyKind {
    /// First sighting; carries every zone the object is currently in
    NewDetection { label: String, zones: Vec<String> },
    /// Zones the object entered since the previous update, in event order
    ZoneEntry { label: String, entered: Vec<String> },
    LeftView { label: String },
}

impl NotifyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyKind::NewDetection { .. } => "new_detection",
            NotifyKind::ZoneEntry { .. } => "zone_entry",
            NotifyKind::LeftView { .. } => "left_view",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NotifyKind::NewDetection { label, .. }
            | NotifyKind::ZoneEntry { label, .. }
            | NotifyKind::LeftView { label } => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    Notify(NotifyKind),
}
