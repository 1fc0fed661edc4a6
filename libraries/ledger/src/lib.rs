//! A small library for local-first persistence in the browser.
//! It was created for SpellWiz, so it only includes what that project needs.
//!
//! Storage model:
//! 1. Everything lives in a string key-value store (`localStorage` in the browser, [`MemoryStore`] elsewhere).
//! 2. A key holds either a JSON map of records ([`RecordStore`]) or a JSON array of versioned events ([`LogStore`]).
//! 3. Writers always re-read the key before writing it, and every write is broadcast to subscribers,
//!    including subscribers in the same tab.
//!
//! Malformed data is never fatal: it is logged and treated as absent.

pub mod data_model;
mod records;
mod storage;

#[cfg(target_arch = "wasm32")]
pub mod local_storage;

pub use data_model::{Event, EventLog, ListenerKey, Listeners};
pub use records::{LogStore, RecordStore};
pub use storage::{KeyValueStore, MemoryStore, StorageChange, StorageError};

/// Derived state computed by replaying an [`EventLog`] from oldest to newest.
pub trait PartialAppState: Sized {
    type Event: Event;

    /// The intermediate state threaded through `process_event`.
    /// For simple cases, this can just be Self.
    type Partial: Sized;

    /// Fold one event into the intermediate state.
    fn process_event(partial: Self::Partial, event: &Self::Event) -> Self::Partial;

    /// Compute derived values once every event has been processed.
    fn finalize(partial: Self::Partial) -> Self;
}
