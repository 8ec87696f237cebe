//! Rule-based analysis over entity state snapshots
//!
//! Every function here is a single pass over an in-memory slice of states.
//! Nothing is cached between calls; callers fetch fresh states and pass the
//! current time explicitly where a rule depends on it.

pub mod anomaly;
pub mod deprecation;
pub mod relationships;
pub mod search;
pub mod suggestions;

pub use anomaly::{detect_anomalies, summarize, Anomaly, AnomalyKind, AnomalySummary, Severity};
pub use deprecation::{check_deprecations, DeprecationFinding};
pub use relationships::{infer_relationships, related_to, room_key, Relationship, RelationshipKind};
pub use search::{search_entities, SearchHit};
pub use suggestions::{suggest_automations, Suggestion};
