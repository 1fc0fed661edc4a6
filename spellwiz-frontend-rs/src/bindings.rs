use std::rc::Rc;

use futures::future::LocalBoxFuture;
use language_utils::{Language, Word, WordList};
use ledger::ListenerKey;
use ledger::local_storage::LocalStorage;
use wasm_bindgen::prelude::*;

use crate::app::{SessionView, SpellingApp};
use crate::cells::NavigationKey;
use crate::config::PracticeConfig;
use crate::host::Host;
use crate::pronunciation::{PronunciationError, Voice};
use crate::recordings::Recording;
use crate::session::{Direction, SessionSummary};
use crate::stage::PracticeView;
use crate::stats::PerformanceOverview;
use crate::utils::mp3_data_url;

/// `setTimeout` and the microtask queue.
struct BrowserHost;

impl Host for BrowserHost {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn schedule(&self, after_ms: u64, task: Box<dyn FnOnce()>) {
        let Some(window) = web_sys::window() else {
            log::error!("No window to schedule a task on");
            return;
        };
        let callback = Closure::once_into_js(move || task());
        let timeout = i32::try_from(after_ms).unwrap_or(i32::MAX);
        if let Err(e) = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), timeout)
        {
            log::error!("setTimeout failed: {e:?}");
        }
    }

    fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(future);
    }
}

/// Audio output supplied by the page. Each function may return a promise that settles when
/// playback ends.
struct JsVoice {
    speak: js_sys::Function,
    play: js_sys::Function,
    stop: js_sys::Function,
}

fn settle(result: Result<JsValue, JsValue>) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
    Box::pin(async move {
        let value = result.map_err(|e| PronunciationError::Playback(format!("{e:?}")))?;
        if let Ok(promise) = value.dyn_into::<js_sys::Promise>() {
            wasm_bindgen_futures::JsFuture::from(promise)
                .await
                .map_err(|e| PronunciationError::Playback(format!("{e:?}")))?;
        }
        Ok(())
    })
}

impl Voice for JsVoice {
    fn synthesize(&self, word: &Word) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
        let text = JsValue::from_str(&word.text);
        let locale = JsValue::from_str(word.language.speech_locale());
        settle(self.speak.call2(&JsValue::NULL, &text, &locale))
    }

    fn play_recording(&self, data_url: &str) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
        settle(self.play.call1(&JsValue::NULL, &JsValue::from_str(data_url)))
    }

    fn play_mp3(&self, bytes: Vec<u8>) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
        let url = mp3_data_url(&bytes);
        settle(self.play.call1(&JsValue::NULL, &JsValue::from_str(&url)))
    }

    fn stop(&self) {
        if let Err(e) = self.stop.call0(&JsValue::NULL) {
            log::warn!("Failed to stop audio: {e:?}");
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct SessionHistory {
    /// Newest first.
    pub sessions: Vec<SessionSummary>,
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        log::error!("Failed to convert value for JS: {e:?}");
        JsValue::NULL
    })
}

#[wasm_bindgen]
pub fn predefined_word_list(language: Language) -> WordList {
    language_utils::predefined_word_list(language, format!("predefined-{language}"))
}

#[wasm_bindgen]
pub fn parse_word_list(list_id: String, name: String, language: Language, text: String) -> WordList {
    language_utils::parse_word_list(list_id, name, language, &text)
}

#[wasm_bindgen]
pub struct SpellWiz {
    app: Rc<SpellingApp>,
}

#[wasm_bindgen]
impl SpellWiz {
    /// `speak(text, locale)` uses the device's speech synthesis, `play(url)` plays audio,
    /// `stop()` silences both.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: PracticeConfig,
        speak: js_sys::Function,
        play: js_sys::Function,
        stop: js_sys::Function,
    ) -> Result<SpellWiz, JsValue> {
        // used to only initialize the logger once
        #[allow(clippy::borrow_interior_mutable_const)]
        *crate::LOGGER;

        let store = LocalStorage::new()
            .map_err(|e| JsValue::from_str(&format!("Failed to open localStorage: {e:?}")))?;
        let voice = JsVoice { speak, play, stop };
        let app = SpellingApp::new(config, Rc::new(BrowserHost), Rc::new(store), Rc::new(voice));
        Ok(Self { app })
    }

    pub fn start_practice(&self, list: WordList) -> bool {
        self.app.start_practice(&list)
    }

    pub fn session_view(&self) -> Option<SessionView> {
        self.app.session_view()
    }

    pub fn practice_view(&self) -> Option<PracticeView> {
        self.app.practice().view()
    }

    pub fn edit(&self, index: usize, value: String) {
        self.app.practice().edit(index, &value);
    }

    pub fn key(&self, index: usize, key: NavigationKey) {
        self.app.practice().key(index, key);
    }

    pub fn submit(&self) {
        self.app.practice().submit();
    }

    pub fn next_stage(&self) {
        self.app.practice().next_stage();
    }

    pub fn previous_stage(&self) {
        self.app.practice().previous_stage();
    }

    pub fn give_up(&self) {
        self.app.practice().give_up();
    }

    pub fn pause(&self) {
        self.app.practice().pause();
    }

    pub fn resume(&self) {
        self.app.practice().resume();
    }

    pub fn replay(&self) {
        self.app.practice().replay();
    }

    pub fn navigate(&self, direction: Direction) -> bool {
        self.app.navigate(direction)
    }

    pub fn end_session(&self) -> Result<Option<SessionSummary>, JsValue> {
        self.app
            .end_session()
            .map_err(|e| JsValue::from_str(&format!("Failed to save session: {e:?}")))
    }

    pub fn history(&self) -> SessionHistory {
        SessionHistory {
            sessions: self.app.history().iter().cloned().collect(),
        }
    }

    pub fn overview(&self) -> PerformanceOverview {
        self.app.overview()
    }

    pub fn clear_history(&self) -> Result<(), JsValue> {
        self.app
            .clear_history()
            .map_err(|e| JsValue::from_str(&format!("Failed to clear history: {e:?}")))
    }

    /// `callback(event)` for every practice event of the current word.
    pub fn subscribe_to_practice(&self, callback: js_sys::Function) -> ListenerKey {
        self.app.practice().subscribe(move |_, event| {
            let _ = callback.call1(&JsValue::NULL, &to_js(event));
        })
    }

    pub fn unsubscribe_from_practice(&self, key: ListenerKey) {
        self.app.practice().unsubscribe(key);
    }

    /// `callback(event)` when the session moves to a word, finishes, or the history changes.
    pub fn subscribe_to_session(&self, callback: js_sys::Function) -> ListenerKey {
        self.app.subscribe(move |_, event| {
            let _ = callback.call1(&JsValue::NULL, &to_js(event));
        })
    }

    pub fn unsubscribe_from_session(&self, key: ListenerKey) {
        self.app.unsubscribe(key);
    }

    /// `callback()` when any recording is saved or deleted, in this tab or another.
    pub fn subscribe_to_recordings(&self, callback: js_sys::Function) -> ListenerKey {
        self.app.recordings().subscribe(move || {
            let _ = callback.call0(&JsValue::NULL);
        })
    }

    pub fn unsubscribe_from_recordings(&self, key: ListenerKey) {
        self.app.recordings().unsubscribe(key);
    }

    pub fn has_recording(&self, word_id: String) -> bool {
        self.app.recordings().has(&word_id)
    }

    pub fn save_recording(&self, word_id: String, data_url: String) -> Result<(), JsValue> {
        self.app
            .recordings()
            .set(&word_id, &Recording { data_url })
            .map_err(|e| JsValue::from_str(&format!("Failed to save recording: {e:?}")))
    }

    pub fn delete_recording(&self, word_id: String) -> Result<(), JsValue> {
        self.app
            .recordings()
            .clear(&word_id)
            .map_err(|e| JsValue::from_str(&format!("Failed to delete recording: {e:?}")))
    }

    pub fn has_eleven_labs_api_key(&self) -> bool {
        use crate::tts::SpeechService as _;
        self.app.tts().is_configured()
    }

    /// An empty key removes the stored one. Returns whether a key is now configured.
    pub fn set_eleven_labs_api_key(&self, api_key: String) -> Result<bool, JsValue> {
        self.app
            .tts()
            .set_api_key(&api_key)
            .map_err(|e| JsValue::from_str(&format!("Failed to save API key: {e:?}")))
    }
}
