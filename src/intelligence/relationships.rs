//! Relationship inference between entities
//!
//! Without access to the device and area registries, relationships are
//! inferred from what the state snapshot carries: group membership lists,
//! person trackers, shared object-id stems and shared room keys.

use crate::client::EntityState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Source is a group (or similar container) listing the target
    GroupMember,
    /// Source is a person tracked by the target device tracker
    Tracks,
    /// Both entities appear to belong to one physical device
    SameDevice,
    /// Both entities appear to be in the same room
    SameArea,
}

impl RelationshipKind {
    pub fn confidence(self) -> f64 {
        match self {
            RelationshipKind::GroupMember | RelationshipKind::Tracks => 1.0,
            RelationshipKind::SameDevice => 0.9,
            RelationshipKind::SameArea => 0.5,
        }
    }

    fn is_directional(self) -> bool {
        matches!(self, RelationshipKind::GroupMember | RelationshipKind::Tracks)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    pub confidence: f64,
}

/// Suffixes that name a measurement rather than a device
const MEASUREMENT_SUFFIXES: &[&str] = &[
    "_battery_level",
    "_battery",
    "_temperature",
    "_humidity",
    "_power",
    "_energy",
    "_voltage",
    "_current",
    "_illuminance",
    "_linkquality",
    "_signal_strength",
];

/// Object id with any measurement suffix removed
pub fn device_base(entity: &EntityState) -> &str {
    let object_id = entity.object_id();
    MEASUREMENT_SUFFIXES
        .iter()
        .find_map(|suffix| object_id.strip_suffix(suffix))
        .filter(|base| !base.is_empty())
        .unwrap_or(object_id)
}

/// Room an entity most likely belongs to
///
/// Uses the `area` attribute when the integration provides one, otherwise the
/// first `_`-separated token of the object id (`kitchen_ceiling` → `kitchen`).
pub fn room_key(entity: &EntityState) -> Option<String> {
    if let Some(area) = entity.attribute_str("area").filter(|a| !a.trim().is_empty()) {
        return Some(area.trim().to_lowercase().replace(' ', "_"));
    }
    let object_id = entity.object_id();
    let token = object_id.split('_').next().unwrap_or(object_id);
    (object_id.contains('_') && !token.is_empty()).then(|| token.to_string())
}

fn string_list(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}

/// Relationship candidates, deduplicated per unordered pair
#[derive(Default)]
struct PairSet {
    pairs: HashMap<(String, String), Relationship>,
}

impl PairSet {
    fn offer(&mut self, source: &str, target: &str, kind: RelationshipKind) {
        if source == target {
            return;
        }
        let key = if source < target {
            (source.to_string(), target.to_string())
        } else {
            (target.to_string(), source.to_string())
        };
        let (source, target) = if kind.is_directional() {
            (source.to_string(), target.to_string())
        } else {
            key.clone()
        };
        let candidate = Relationship {
            source,
            target,
            kind,
            confidence: kind.confidence(),
        };
        match self.pairs.get(&key) {
            Some(existing) if existing.confidence >= candidate.confidence => {}
            _ => {
                self.pairs.insert(key, candidate);
            }
        }
    }

    fn into_sorted(self) -> Vec<Relationship> {
        let mut relationships: Vec<_> = self.pairs.into_values().collect();
        relationships.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.target.cmp(&b.target))
        });
        relationships
    }
}

/// Infer relationships across a state snapshot, strongest first
pub fn infer_relationships(states: &[EntityState]) -> Vec<Relationship> {
    let mut pairs = PairSet::default();

    for state in states {
        for member in string_list(state.attributes.get("entity_id")) {
            pairs.offer(&state.entity_id, member, RelationshipKind::GroupMember);
        }
        if state.domain() == "person" {
            for tracker in string_list(state.attributes.get("device_trackers")) {
                pairs.offer(&state.entity_id, tracker, RelationshipKind::Tracks);
            }
        }
    }

    let mut by_base: BTreeMap<&str, Vec<&EntityState>> = BTreeMap::new();
    let mut by_room: BTreeMap<String, Vec<&EntityState>> = BTreeMap::new();
    for state in states {
        by_base.entry(device_base(state)).or_default().push(state);
        if let Some(room) = room_key(state) {
            by_room.entry(room).or_default().push(state);
        }
    }

    for members in by_base.values().filter(|m| m.len() > 1) {
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                pairs.offer(&a.entity_id, &b.entity_id, RelationshipKind::SameDevice);
            }
        }
    }

    for members in by_room.values().filter(|m| m.len() > 1) {
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                if device_base(a) != device_base(b) {
                    pairs.offer(&a.entity_id, &b.entity_id, RelationshipKind::SameArea);
                }
            }
        }
    }

    pairs.into_sorted()
}

/// Relationships touching one entity
pub fn related_to(states: &[EntityState], entity_id: &str) -> Vec<Relationship> {
    infer_relationships(states)
        .into_iter()
        .filter(|r| r.source == entity_id || r.target == entity_id)
        .collect()
}
