//! Renders loader transitions as text lines or enveloped JSON lines.

use std::io::Write;
use std::path::PathBuf;

use load_event::EnvelopeState;
use resource_loader::{snapshot_to_json, LoadView, Query, Snapshot};
use serde_json::Value;

use crate::CliError;

/// Where and how transitions are printed. One per run; loaders share it so JSON event ids
/// are numbered across all endpoints.
pub struct Output {
    json: bool,
    pretty: bool,
    file: Option<PathBuf>,
    events: EnvelopeState,
}

impl Output {
    pub fn new(json: bool, pretty: bool, file: Option<PathBuf>) -> Self {
        Self {
            json,
            pretty,
            file,
            events: EnvelopeState::new(),
        }
    }

    /// Renders one transition of `loader_id`. Idle snapshots print nothing.
    pub fn emit(
        &mut self,
        loader_id: &str,
        snapshot: &Snapshot<Query, Value>,
    ) -> Result<(), CliError> {
        if !self.json {
            if snapshot.state.is_idle() {
                return Ok(());
            }
            let text = render_text(loader_id, &snapshot.view());
            return self.write(&text).map_err(CliError::from);
        }
        let Some(value) = snapshot_to_json(snapshot, loader_id, &mut self.events)? else {
            return Ok(());
        };
        let line = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        self.write(&line).map_err(CliError::from)
    }

    fn write(&self, text: &str) -> std::io::Result<()> {
        match &self.file {
            Some(path) => {
                let mut f = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                writeln!(f, "{}", text)
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", text)?;
                stdout.flush()
            }
        }
    }
}

/// Keeps the first `n` items of a list payload; other payloads pass through.
pub fn limit_value(value: Value, n: usize) -> Value {
    match value {
        Value::Array(items) => {
            let view = LoadView {
                data: Some(items),
                loading: false,
                error: None,
            };
            Value::Array(view.limit(n).data.unwrap_or_default())
        }
        other => other,
    }
}

/// Replaces each list item by its `field` (null when absent).
pub fn project_field(value: &Value, field: &str) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| item.get(field).cloned().unwrap_or(Value::Null))
                .collect(),
        ),
        other => other.get(field).cloned().unwrap_or(Value::Null),
    }
}

fn item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `<id>: loading`, `<id>: error: <message>`, or the data: lists as a count followed by one
/// indented item per line, anything else as compact JSON.
pub fn render_text(loader_id: &str, view: &LoadView<Value>) -> String {
    if view.loading {
        return format!("{}: loading", loader_id);
    }
    if let Some(error) = &view.error {
        return format!("{}: error: {}", loader_id, error);
    }
    match &view.data {
        Some(Value::Array(items)) => {
            let plural = if items.len() == 1 { "" } else { "s" };
            let mut out = format!("{}: {} item{}", loader_id, items.len(), plural);
            for item in items {
                out.push_str("\n  - ");
                out.push_str(&item_text(item));
            }
            out
        }
        Some(other) => format!("{}: {}", loader_id, other),
        None => format!("{}: (no data)", loader_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_loader::{FetchError, LoadState};
    use serde_json::json;

    fn view(state: LoadState<Value>) -> LoadView<Value> {
        state.view()
    }

    #[test]
    fn text_for_each_state() {
        assert_eq!(render_text("dashboard", &view(LoadState::Loading)), "dashboard: loading");
        let failed = view(LoadState::Failed(FetchError::new("network error")));
        assert_eq!(
            render_text("dashboard", &failed),
            "dashboard: error: network error"
        );
        let collections = view(LoadState::Loaded(json!(["Our analytics", {"id": 2}])));
        assert_eq!(
            render_text("collection", &collections),
            "collection: 2 items\n  - Our analytics\n  - {\"id\":2}"
        );
        assert_eq!(
            render_text("dashboard/1", &view(LoadState::Loaded(json!({"id": 1})))),
            "dashboard/1: {\"id\":1}"
        );
        assert_eq!(
            render_text("collection", &view(LoadState::Loaded(json!(["A"])))),
            "collection: 1 item\n  - A"
        );
    }

    #[test]
    fn limit_truncates_lists_only() {
        assert_eq!(limit_value(json!([1, 2, 3, 4, 5]), 4), json!([1, 2, 3, 4]));
        assert_eq!(limit_value(json!([1]), 4), json!([1]));
        assert_eq!(limit_value(json!({"id": 1}), 0), json!({"id": 1}));
    }

    #[test]
    fn project_field_maps_list_items() {
        let data = json!([{"id": 1, "name": "A"}, {"id": 2}]);
        assert_eq!(project_field(&data, "name"), json!(["A", null]));
        assert_eq!(project_field(&json!({"name": "B"}), "name"), json!("B"));
    }

    #[test]
    fn json_lines_are_numbered_across_loaders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        let mut out = Output::new(true, false, Some(path.clone()));

        let loading = Snapshot {
            generation: 1,
            query: Some(Query::new("dashboard")),
            state: LoadState::Loading,
        };
        let loaded = Snapshot {
            generation: 1,
            query: Some(Query::new("collection")),
            state: LoadState::Loaded(json!([])),
        };
        out.emit("dashboard", &Snapshot::default()).unwrap();
        out.emit("dashboard", &loading).unwrap();
        out.emit("collection", &loaded).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "loading");
        assert_eq!(lines[0]["event_id"], 1);
        assert_eq!(lines[1]["loader_id"], "collection");
        assert_eq!(lines[1]["event_id"], 2);
    }
}
