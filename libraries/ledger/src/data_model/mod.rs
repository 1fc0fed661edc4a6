#[path = "1-event.rs"]
mod event;

#[path = "2-listeners.rs"]
mod listeners;

#[path = "3-event-log.rs"]
mod event_log;

pub use event::*;
pub use event_log::*;
pub use listeners::*;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ListenerKey(pub(crate) slotmap::DefaultKey);
