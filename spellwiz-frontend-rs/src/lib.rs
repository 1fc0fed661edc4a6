#![deny(clippy::string_slice)]

pub mod app;
pub mod blanks;
pub mod cells;
pub mod checker;
pub mod config;
pub mod context;
pub mod host;
pub mod penalty;
pub mod practice;
pub mod pronunciation;
pub mod recordings;
pub mod session;
pub mod stage;
pub mod stats;
pub mod timer;
pub mod tts;
pub mod utils;

#[cfg(target_arch = "wasm32")]
mod bindings;

pub use app::{SessionEvent, SessionView, SpellingApp};
pub use config::PracticeConfig;
pub use context::WordContext;
pub use host::{Host, ManualHost};
pub use practice::Practice;
pub use pronunciation::{LayeredGateway, PronunciationError, PronunciationGateway, Voice};
pub use session::{Direction, SessionSummary, SpellingSession};
pub use stage::{Effect, Input, PracticeEvent, PracticeView, Stage, StageMachine};
pub use stats::PerformanceOverview;

#[cfg(target_arch = "wasm32")]
pub use bindings::SpellWiz;

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[cfg(target_arch = "wasm32")]
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: std::sync::LazyLock<()> = std::sync::LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});
