//! Bridge from [`Snapshot`] to the `load-event` wire format.

use serde::Serialize;
use serde_json::Value;

use load_event::{EnvelopeState, LoadEvent};

use crate::state::{LoadState, Snapshot};

/// Converts a snapshot into a [`LoadEvent`]. `Idle` has no event and yields `Ok(None)`.
pub fn snapshot_to_event<Q, T>(
    snapshot: &Snapshot<Q, T>,
) -> Result<Option<LoadEvent>, serde_json::Error>
where
    Q: Serialize,
    T: Serialize,
{
    let query = serde_json::to_value(&snapshot.query)?;
    let event = match &snapshot.state {
        LoadState::Idle => return Ok(None),
        LoadState::Loading => LoadEvent::Loading { query },
        LoadState::Loaded(data) => LoadEvent::Loaded {
            query,
            data: serde_json::to_value(data)?,
        },
        LoadState::Failed(error) => LoadEvent::Failed {
            query,
            error: error.to_string(),
        },
    };
    Ok(Some(event))
}

/// Snapshot to enveloped JSON, numbered by `state`. `Idle` yields `Ok(None)`.
pub fn snapshot_to_json<Q, T>(
    snapshot: &Snapshot<Q, T>,
    loader_id: &str,
    state: &mut EnvelopeState,
) -> Result<Option<Value>, serde_json::Error>
where
    Q: Serialize,
    T: Serialize,
{
    match snapshot_to_event(snapshot)? {
        Some(event) => {
            load_event::to_json(&event, loader_id, snapshot.generation, state).map(Some)
        }
        None => Ok(None),
    }
}
