//! Load event protocol: type + payload + envelope.
//!
//! This crate defines the wire shape of one loader state transition and envelope injection.
//! It does not depend on the loader. `resource-loader` bridges its snapshots into
//! [`LoadEvent`] and calls [`to_json`].

pub mod envelope;
pub mod event;

pub use envelope::{to_json, Envelope, EnvelopeState};
pub use event::LoadEvent;
