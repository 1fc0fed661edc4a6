//! Ties a practice session to the per-word practice, the saved history, and audio.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use language_utils::{Word, WordList};
use ledger::data_model::flush;
use ledger::{EventLog, KeyValueStore, ListenerKey, Listeners, LogStore, PartialAppState as _, StorageError};
use rand_chacha::ChaCha8Rng;

use crate::config::PracticeConfig;
use crate::context::WordContext;
use crate::host::Host;
use crate::practice::Practice;
use crate::pronunciation::{LayeredGateway, Voice};
use crate::recordings::Recordings;
use crate::session::{Direction, Progress, RESULTS_STORAGE_KEY, SessionSummary, SpellingSession};
use crate::stage::PracticeEvent;
use crate::stats::PerformanceOverview;
use crate::tts::{ElevenLabs, SpeechService};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A word is now being practiced (possibly the same one again).
    #[serde(rename_all = "camelCase")]
    WordChanged {
        word: Word,
        index: usize,
        total: usize,
    },
    Finished { summary: SessionSummary },
    /// The saved history changed, here or in another tab.
    HistoryChanged,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub list_name: String,
    pub word: Word,
    pub index: usize,
    pub total: usize,
    pub score: f64,
    pub mistake_words: Vec<String>,
}

pub struct SpellingApp {
    this: Weak<SpellingApp>,
    host: Rc<dyn Host>,
    rng: RefCell<ChaCha8Rng>,
    context: WordContext,
    practice: Rc<Practice>,
    session: RefCell<Option<SpellingSession>>,
    history: LogStore<SessionSummary>,
    recordings: Recordings,
    tts: Rc<ElevenLabs>,
    listeners: RefCell<Listeners<SessionEvent>>,
    history_key: Cell<Option<ListenerKey>>,
}

impl SpellingApp {
    pub fn new(
        config: PracticeConfig,
        host: Rc<dyn Host>,
        store: Rc<dyn KeyValueStore>,
        voice: Rc<dyn Voice>,
    ) -> Rc<Self> {
        let recordings = Recordings::new(store.clone());
        let tts = Rc::new(ElevenLabs::new(store.clone()));
        let speech: Rc<dyn SpeechService> = tts.clone();
        let gateway = Rc::new(LayeredGateway::new(
            voice,
            recordings.clone(),
            Some(speech),
            host.clone(),
            config.clone(),
        ));
        let context = WordContext::new();
        let practice = Practice::new(config.clone(), host.clone(), gateway, &context);

        let app = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            host,
            rng: RefCell::new(config.rng()),
            context,
            practice,
            session: RefCell::new(None),
            history: LogStore::new(store, RESULTS_STORAGE_KEY),
            recordings,
            tts,
            listeners: Default::default(),
            history_key: Cell::new(None),
        });

        let this = app.this.clone();
        app.practice.subscribe(move |_, event| {
            if let PracticeEvent::WordComplete {
                correct, penalty, ..
            } = event
            {
                if let Some(app) = this.upgrade() {
                    app.on_word_complete(*correct, *penalty);
                }
            }
        });

        let this = app.this.clone();
        let key = app.history.subscribe(move || {
            if let Some(app) = this.upgrade() {
                app.emit(&SessionEvent::HistoryChanged);
            }
        });
        app.history_key.set(Some(key));
        app
    }

    pub fn practice(&self) -> &Rc<Practice> {
        &self.practice
    }

    pub fn context(&self) -> &WordContext {
        &self.context
    }

    pub fn recordings(&self) -> &Recordings {
        &self.recordings
    }

    pub fn tts(&self) -> &ElevenLabs {
        &self.tts
    }

    pub fn subscribe(&self, listener: impl Fn(ListenerKey, &SessionEvent) + 'static) -> ListenerKey {
        self.listeners.borrow_mut().register(listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.listeners.borrow_mut().unregister(key);
    }

    fn emit(&self, event: &SessionEvent) {
        let notifications = self.listeners.borrow().notifications(event, None);
        flush(notifications);
    }

    /// Starts practicing `list`, weakest words first. Returns false if the list is empty.
    pub fn start_practice(&self, list: &WordList) -> bool {
        let history = self.history.load();
        let session = SpellingSession::start(list, &history, &mut *self.rng.borrow_mut());
        let started = session.is_some();
        *self.session.borrow_mut() = session;
        if started {
            self.show_current();
        }
        started
    }

    pub fn session_view(&self) -> Option<SessionView> {
        let session = self.session.borrow();
        let session = session.as_ref()?;
        Some(SessionView {
            list_name: session.list().name.clone(),
            word: session.current_word()?.clone(),
            index: session.index(),
            total: session.list().len(),
            score: session.score(),
            mistake_words: session.mistake_words().to_vec(),
        })
    }

    fn show_current(&self) {
        let Some(view) = self.session_view() else {
            return;
        };
        self.context.set(Some(view.word.clone()));
        self.emit(&SessionEvent::WordChanged {
            word: view.word,
            index: view.index,
            total: view.total,
        });
    }

    fn on_word_complete(&self, correct: bool, penalty: f64) {
        let now_ms = self.host.now_ms();
        let progress = self
            .session
            .borrow_mut()
            .as_mut()
            .map(|session| session.word_complete(correct, penalty, now_ms));
        match progress {
            None => {}
            Some(Progress::Stay) | Some(Progress::Moved) => self.show_current(),
            Some(Progress::Finished(summary)) => {
                log::info!("Session completed with score {}", summary.score);
                let _ = self
                    .finish(summary)
                    .inspect_err(|e| log::error!("Failed to save session results: {e:?}"));
            }
        }
    }

    /// Skips to the next or previous word. Returns false at either end of the list.
    pub fn navigate(&self, direction: Direction) -> bool {
        let moved = self
            .session
            .borrow_mut()
            .as_mut()
            .is_some_and(|session| session.navigate(direction));
        if moved {
            self.show_current();
        }
        moved
    }

    /// Ends the session early and saves what was done so far.
    pub fn end_session(&self) -> Result<Option<SessionSummary>, StorageError> {
        let now_ms = self.host.now_ms();
        let summary = self
            .session
            .borrow()
            .as_ref()
            .map(|session| session.summary(false, now_ms));
        let Some(summary) = summary else {
            return Ok(None);
        };
        log::info!("Session ended early with score {}", summary.score);
        self.finish(summary.clone())?;
        Ok(Some(summary))
    }

    fn finish(&self, summary: SessionSummary) -> Result<(), StorageError> {
        self.session.replace(None);
        self.context.set(None);
        let saved = self.history.append(summary.clone());
        self.emit(&SessionEvent::Finished { summary });
        saved
    }

    /// Newest first.
    pub fn history(&self) -> EventLog<SessionSummary> {
        self.history.load()
    }

    pub fn overview(&self) -> PerformanceOverview {
        self.history.load().state()
    }

    pub fn clear_history(&self) -> Result<(), StorageError> {
        log::info!("Clearing practice history");
        self.history.clear()
    }
}

impl Drop for SpellingApp {
    fn drop(&mut self) {
        if let Some(key) = self.history_key.take() {
            self.history.unsubscribe(key);
        }
    }
}
