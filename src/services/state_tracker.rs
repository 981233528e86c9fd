//! Per-object state and the notify/skip state machine
//!
//! For each object id the tracker remembers whether its `new` event was
//! already notified, which zones it was in at the last `new`/`update`, and
//! the last label Frigate sent for it. Messages without a label reuse the
//! remembered one, falling back to `Object`.
//! Zone history is replaced on every update, not merged: a zone that is left
//! and later re-entered is reported as entered again.
//!
//! With `EvictionPolicy::Never` (the default) entries live for the whole
//! process, so the store grows with every distinct object id seen.

use crate::domain::decision::{Decision, NotifyKind, SkipReason};
use crate::domain::types::{Event, EventKind, ObjectId};
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};

/// Label used when Frigate never sent one for the object
pub const DEFAULT_LABEL: &str = "Object";

/// When per-object state is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Keep every entry for the process lifetime
    #[default]
    Never,
    /// Drop an object's entry once its `end` event has been handled
    OnEnd,
    /// Drop entries not referenced for longer than the given duration
    Ttl(Duration),
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Never => "never",
            EvictionPolicy::OnEnd => "on_end",
            EvictionPolicy::Ttl(_) => "ttl",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectState {
    /// Set on the first accepted `new` event, never reset
    pub seen_new: bool,
    /// Zones reported by the latest `new`/`update`
    pub entered_zones: Vec<String>,
    /// Latest label seen on an accepted `new` or an `update`
    pub label: Option<String>,
    pub last_touched: Instant,
}

impl ObjectState {
    fn new(now: Instant) -> Self {
        Self { seen_new: false, entered_zones: Vec::new(), label: None, last_touched: now }
    }
}

/// Object state keyed by object id, with eviction applied by the tracker
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: FxHashMap<ObjectId, ObjectState>,
}

impl ObjectStore {
    pub fn get(&self, id: &ObjectId) -> Option<&ObjectState> {
        self.objects.get(id)
    }

    /// Get or lazily create the entry for `id`, marking it touched
    fn touch(&mut self, id: &ObjectId, now: Instant) -> &mut ObjectState {
        let state =
            self.objects.entry(id.clone()).or_insert_with(|| ObjectState::new(now));
        state.last_touched = now;
        state
    }

    fn remove(&mut self, id: &ObjectId) -> Option<ObjectState> {
        self.objects.remove(id)
    }

    /// Drop entries untouched for longer than `ttl`. Returns how many were dropped.
    fn evict_older_than(&mut self, ttl: Duration, now: Instant) -> usize {
        let before = self.objects.len();
        self.objects.retain(|_, state| now.saturating_duration_since(state.last_touched) <= ttl);
        before - self.objects.len()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

pub struct EventStateTracker {
    store: ObjectStore,
    eviction: EvictionPolicy,
}

impl EventStateTracker {
    pub fn new(eviction: EvictionPolicy) -> Self {
        Self { store: ObjectStore::default(), eviction }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Number of object ids currently held
    pub fn tracked_objects(&self) -> usize {
        self.store.len()
    }

    /// Decide whether `event` should be notified, updating per-object state
    pub fn decide(&mut self, event: &Event, now: Instant) -> Decision {
        if let EvictionPolicy::Ttl(ttl) = self.eviction {
            self.store.evict_older_than(ttl, now);
        }

        match &event.kind {
            EventKind::New => self.on_new(event, now),
            EventKind::Update => self.on_update(event, now),
            EventKind::End => {
                // Read-only lookup; `end` never changes state unless OnEnd evicts it
                let label = self.label_for(event);
                if self.eviction == EvictionPolicy::OnEnd {
                    self.store.remove(&event.object_id);
                }
                Decision::Notify(NotifyKind::LeftView { label })
            }
            EventKind::Other(_) => Decision::Skip(SkipReason::UnknownType),
        }
    }

    /// The event's own label, else the last one seen for the object, else `Object`
    pub fn label_for(&self, event: &Event) -> String {
        event
            .label
            .as_deref()
            .or_else(|| self.store.get(&event.object_id).and_then(|s| s.label.as_deref()))
            .unwrap_or(DEFAULT_LABEL)
            .to_string()
    }

    fn on_new(&mut self, event: &Event, now: Instant) -> Decision {
        // Duplicates must not refresh last_touched
        if self.store.get(&event.object_id).is_some_and(|s| s.seen_new) {
            return Decision::Skip(SkipReason::DuplicateNew);
        }

        let label = self.label_for(event);
        let state = self.store.touch(&event.object_id, now);
        state.seen_new = true;
        state.entered_zones = event.zones.clone();
        remember_label(state, event);
        Decision::Notify(NotifyKind::NewDetection { label, zones: event.zones.clone() })
    }

    fn on_update(&mut self, event: &Event, now: Instant) -> Decision {
        let label = self.label_for(event);
        let state = self.store.touch(&event.object_id, now);
        remember_label(state, event);

        let entered: Vec<String> = event
            .zones
            .iter()
            .filter(|zone| !state.entered_zones.contains(zone))
            .cloned()
            .collect();

        // Replace, not merge
        state.entered_zones = event.zones.clone();

        if entered.is_empty() {
            Decision::Skip(SkipReason::NoZoneChange)
        } else {
            Decision::Notify(NotifyKind::ZoneEntry { label, entered })
        }
    }
}

fn remember_label(state: &mut ObjectState, event: &Event) {
    if let Some(label) = &event.label {
        state.label = Some(label.clone());
    }
}

impl Default for EventStateTracker {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}
