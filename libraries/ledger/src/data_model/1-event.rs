//! # Event
//! Events are the unit of persisted history. Each one is written once and never mutated.
//! For robustness, events must be versionable. The type stored on disk is a "versioned" wrapper,
//! so that the data model can evolve without breaking data saved by older builds.

pub trait Event: Sized + Clone {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error>;
}
