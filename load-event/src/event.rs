//! Event types: one variant per state a loader can move into.
//! Query and payload travel as `serde_json::Value`; the bridge in resource-loader serializes them.

use serde::Serialize;
use serde_json::Value;

/// Wire shape of one transition (type + payload). The envelope (loader_id, generation,
/// event_id) is applied separately.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadEvent {
    Loading { query: Value },
    Loaded { query: Value, data: Value },
    Failed { query: Value, error: String },
}

impl LoadEvent {
    /// Serializes this event to a JSON object (type + payload only; no envelope).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
