//! Behavioral events and the bounded window the core reasons over.
//!
//! Events are owned by the ingestion pipeline. The core only ever sees a
//! bounded, ordered slice of the most recent ones.

pub mod types;
pub mod window;

pub use types::{Event, EventPayload};
pub use window::{EventWindow, DEFAULT_WINDOW_CAPACITY};
