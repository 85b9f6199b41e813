//! Envelope (loader_id, generation, event_id) added to every event.
//! EnvelopeState numbers the events of one output stream.

use crate::event::LoadEvent;
use serde_json::Value;

/// Envelope fields attached to each event.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Which loader emitted the event; constant for a loader's lifetime.
    pub loader_id: Option<String>,
    /// Request generation the event belongs to.
    pub generation: Option<u64>,
    /// Per-stream sequence number; monotonically increasing.
    pub event_id: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader_id(mut self, id: impl Into<String>) -> Self {
        self.loader_id = Some(id.into());
        self
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn with_event_id(mut self, id: u64) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Merges envelope fields into the given JSON object (top-level only).
    /// Does not overwrite existing keys.
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(ref id) = self.loader_id {
            obj.entry("loader_id")
                .or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(generation) = self.generation {
            obj.entry("generation")
                .or_insert_with(|| Value::from(generation));
        }
        if let Some(id) = self.event_id {
            obj.entry("event_id").or_insert_with(|| Value::from(id));
        }
    }
}

/// Numbering state for one output stream. Several loaders may share a stream; each event
/// names its own loader.
pub struct EnvelopeState {
    pub next_event_id: u64,
}

impl Default for EnvelopeState {
    fn default() -> Self {
        Self { next_event_id: 1 }
    }
}

impl EnvelopeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects the envelope for `loader_id` / `generation` and advances the event id.
    pub fn inject_into(&mut self, value: &mut Value, loader_id: &str, generation: u64) {
        let env = Envelope::new()
            .with_loader_id(loader_id)
            .with_generation(generation)
            .with_event_id(self.next_event_id);
        self.next_event_id += 1;
        env.inject_into(value);
    }
}

/// Converts an event to JSON and injects the envelope using the given state.
pub fn to_json(
    event: &LoadEvent,
    loader_id: &str,
    generation: u64,
    state: &mut EnvelopeState,
) -> Result<Value, serde_json::Error> {
    let mut value = event.to_value()?;
    state.inject_into(&mut value, loader_id, generation);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_inject_keeps_existing_keys() {
        let mut obj = json!({"type": "loading", "generation": 9});
        Envelope::new()
            .with_loader_id("dashboards")
            .with_generation(1)
            .with_event_id(4)
            .inject_into(&mut obj);
        assert_eq!(obj["loader_id"], "dashboards");
        assert_eq!(obj["generation"], 9);
        assert_eq!(obj["event_id"], 4);
    }

    #[test]
    fn non_object_values_are_left_alone() {
        let mut v = json!([1, 2]);
        Envelope::new().with_event_id(1).inject_into(&mut v);
        assert_eq!(v, json!([1, 2]));
    }

    #[test]
    fn to_json_numbers_events_in_order() {
        let mut state = EnvelopeState::new();
        let loading = LoadEvent::Loading {
            query: json!("collection"),
        };
        let failed = LoadEvent::Failed {
            query: json!("collection"),
            error: "network error".to_string(),
        };

        let first = to_json(&loading, "collections", 1, &mut state).unwrap();
        let second = to_json(&failed, "collections", 1, &mut state).unwrap();

        assert_eq!(first["event_id"], 1);
        assert_eq!(second["event_id"], 2);
        assert_eq!(second["type"], "failed");
        assert_eq!(second["loader_id"], "collections");
        assert_eq!(second["generation"], 1);
    }
}
