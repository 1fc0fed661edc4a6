//! Saying a word out loud.
//!
//! Sources are tried in order: a recording made for this word, then (for Urdu, once the
//! device voice has had a few chances or has already been passed over) ElevenLabs, then
//! the device's speech synthesis. Starting a new request or calling `cancel` abandons
//! whatever is in flight; repetitions still waiting to play are skipped.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use language_utils::{Language, TtsRequest, Word};

use crate::config::PracticeConfig;
use crate::host::Host;
use crate::recordings::Recordings;
use crate::tts::{SpeechService, TtsError};

#[derive(Debug, thiserror::Error)]
pub enum PronunciationError {
    #[error("no voice available for {0}")]
    NoVoice(Language),
    #[error("playback failed: {0}")]
    Playback(String),
    #[error("text-to-speech failed: {0}")]
    Tts(#[from] TtsError),
}

pub trait PronunciationGateway {
    fn speak(&self, word: &Word, times: u32) -> LocalBoxFuture<'static, Result<(), PronunciationError>>;
    fn cancel(&self);
}

/// The device's audio output.
pub trait Voice {
    fn synthesize(&self, word: &Word) -> LocalBoxFuture<'static, Result<(), PronunciationError>>;
    /// Plays a recording stored as a `data:` URL.
    fn play_recording(&self, data_url: &str) -> LocalBoxFuture<'static, Result<(), PronunciationError>>;
    fn play_mp3(&self, bytes: Vec<u8>) -> LocalBoxFuture<'static, Result<(), PronunciationError>>;
    fn stop(&self);
}

/// After this many playbacks of the same Urdu word, the device voice is passed over.
const DEVICE_VOICE_CHANCES: u32 = 2;

#[derive(Default)]
struct WordPlayback {
    word_id: String,
    playbacks: u32,
    tts_engaged: bool,
}

struct Inner {
    voice: Rc<dyn Voice>,
    recordings: Recordings,
    tts: Option<Rc<dyn SpeechService>>,
    host: Rc<dyn Host>,
    config: PracticeConfig,
    generation: Cell<u64>,
    playback: RefCell<WordPlayback>,
}

#[derive(Clone)]
pub struct LayeredGateway {
    inner: Rc<Inner>,
}

impl LayeredGateway {
    pub fn new(
        voice: Rc<dyn Voice>,
        recordings: Recordings,
        tts: Option<Rc<dyn SpeechService>>,
        host: Rc<dyn Host>,
        config: PracticeConfig,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                voice,
                recordings,
                tts,
                host,
                config,
                generation: Cell::new(0),
                playback: Default::default(),
            }),
        }
    }
}

impl Inner {
    /// Counts this playback and decides whether it should go to the TTS service.
    fn should_use_tts(&self, word: &Word) -> bool {
        let mut playback = self.playback.borrow_mut();
        if playback.word_id != word.id {
            *playback = WordPlayback {
                word_id: word.id.clone(),
                ..Default::default()
            };
        }
        let previous = playback.playbacks;
        playback.playbacks += 1;

        let configured = self.tts.as_ref().is_some_and(|tts| tts.is_configured());
        let wants_tts = word.language == Language::Urdu
            && (previous > DEVICE_VOICE_CHANCES || playback.tts_engaged);
        if wants_tts && configured {
            playback.tts_engaged = true;
            return true;
        }
        false
    }

    fn superseded(&self, generation: u64) -> bool {
        self.generation.get() != generation
    }

    /// Plays `word` once. Once `generation` is superseded, nothing further is played and
    /// errors from the abandoned playback are swallowed.
    async fn play_once(&self, word: &Word, generation: u64) -> Result<(), PronunciationError> {
        let use_tts = self.should_use_tts(word);

        if let Some(recording) = self.recordings.get(&word.id) {
            let played = self.voice.play_recording(&recording.data_url).await;
            if self.superseded(generation) {
                return Ok(());
            }
            match played {
                Ok(()) => return Ok(()),
                Err(e) => log::warn!("Recording for word {} failed to play: {e:?}", word.id),
            }
        }

        if let Some(tts) = self.tts.clone().filter(|_| use_tts) {
            let request = TtsRequest {
                text: word.text.clone(),
                language: word.language,
            };
            let played = match tts.synthesize(&request).await {
                Ok(_) if self.superseded(generation) => {
                    log::debug!("Dropping synthesized audio for superseded word {}", word.id);
                    return Ok(());
                }
                Ok(bytes) => self.voice.play_mp3(bytes).await,
                Err(e) => Err(e.into()),
            };
            if self.superseded(generation) {
                return Ok(());
            }
            match played {
                Ok(()) => return Ok(()),
                Err(e) => log::warn!("ElevenLabs failed for word {}: {e:?}", word.id),
            }
        }

        let played = self.voice.synthesize(word).await;
        if self.superseded(generation) {
            return Ok(());
        }
        played
    }
}

impl PronunciationGateway for LayeredGateway {
    fn speak(&self, word: &Word, times: u32) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
        let inner = self.inner.clone();
        let generation = inner.generation.get() + 1;
        inner.generation.set(generation);
        inner.voice.stop();

        let word = word.clone();
        let delay = u64::from(inner.config.repeat_delay_ms(word.language));
        Box::pin(async move {
            for repetition in 0..times {
                if repetition > 0 {
                    inner.host.sleep(delay).await;
                }
                if inner.superseded(generation) {
                    log::debug!("Pronunciation of {} superseded", word.id);
                    return Ok(());
                }
                inner.play_once(&word, generation).await?;
            }
            Ok(())
        })
    }

    fn cancel(&self) {
        self.inner.generation.set(self.inner.generation.get() + 1);
        self.inner.voice.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualHost;
    use crate::recordings::Recording;
    use futures::channel::oneshot;
    use ledger::{KeyValueStore, MemoryStore};

    #[derive(Default)]
    struct FakeVoice {
        played: RefCell<Vec<String>>,
        stops: Cell<u32>,
        broken_recordings: Cell<bool>,
        /// Recordings keep playing until `stop`, which makes them fail.
        held_recordings: Cell<bool>,
        playing: RefCell<Vec<oneshot::Sender<()>>>,
    }

    impl Voice for FakeVoice {
        fn synthesize(&self, word: &Word) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
            self.played.borrow_mut().push(format!("synth:{}", word.text));
            Box::pin(async { Ok(()) })
        }

        fn play_recording(&self, data_url: &str) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
            self.played.borrow_mut().push(format!("recording:{data_url}"));
            if self.held_recordings.get() {
                let (tx, rx) = oneshot::channel();
                self.playing.borrow_mut().push(tx);
                return Box::pin(async move {
                    rx.await
                        .map_err(|_| PronunciationError::Playback("interrupted".to_string()))
                });
            }
            let broken = self.broken_recordings.get();
            Box::pin(async move {
                if broken {
                    Err(PronunciationError::Playback("decode error".to_string()))
                } else {
                    Ok(())
                }
            })
        }

        fn play_mp3(&self, bytes: Vec<u8>) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
            self.played.borrow_mut().push(format!("mp3:{}", bytes.len()));
            Box::pin(async { Ok(()) })
        }

        fn stop(&self) {
            self.stops.set(self.stops.get() + 1);
            self.playing.borrow_mut().clear();
        }
    }

    struct FakeTts {
        configured: bool,
    }

    impl SpeechService for FakeTts {
        fn is_configured(&self) -> bool {
            self.configured
        }

        fn synthesize(&self, _request: &TtsRequest) -> LocalBoxFuture<'static, Result<Vec<u8>, TtsError>> {
            Box::pin(async { Ok(b"ID3".to_vec()) })
        }
    }

    struct Fixture {
        host: Rc<ManualHost>,
        voice: Rc<FakeVoice>,
        recordings: Recordings,
        gateway: LayeredGateway,
    }

    fn fixture(tts_configured: bool) -> Fixture {
        let host = Rc::new(ManualHost::new());
        let voice = Rc::new(FakeVoice::default());
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let recordings = Recordings::new(store);
        let tts: Rc<dyn SpeechService> = Rc::new(FakeTts {
            configured: tts_configured,
        });
        let gateway = LayeredGateway::new(
            voice.clone(),
            recordings.clone(),
            Some(tts),
            host.clone(),
            PracticeConfig::default(),
        );
        Fixture {
            host,
            voice,
            recordings,
            gateway,
        }
    }

    fn speak(f: &Fixture, word: &Word, times: u32) {
        let future = f.gateway.speak(word, times);
        f.host.spawn(Box::pin(async move {
            if let Err(e) = future.await {
                panic!("unexpected error: {e:?}");
            }
        }));
        f.host.run_until_stalled();
    }

    #[test]
    fn test_synthesis_when_nothing_else_applies() {
        let f = fixture(false);
        let word = Word::new("1", "cat", Language::English);
        speak(&f, &word, 1);
        assert_eq!(*f.voice.played.borrow(), vec!["synth:cat".to_string()]);
    }

    #[test]
    fn test_recording_wins() {
        let f = fixture(true);
        f.recordings
            .set("1", &Recording {
                data_url: "data:audio/webm;base64,AA==".to_string(),
            })
            .unwrap();
        let word = Word::new("1", "cat", Language::English);
        speak(&f, &word, 1);
        assert_eq!(
            *f.voice.played.borrow(),
            vec!["recording:data:audio/webm;base64,AA==".to_string()]
        );
    }

    #[test]
    fn test_broken_recording_falls_through() {
        let f = fixture(false);
        f.voice.broken_recordings.set(true);
        f.recordings
            .set("1", &Recording {
                data_url: "data:audio/webm;base64,AA==".to_string(),
            })
            .unwrap();
        let word = Word::new("1", "cat", Language::English);
        speak(&f, &word, 1);
        assert_eq!(f.voice.played.borrow().last().unwrap(), "synth:cat");
    }

    #[test]
    fn test_repetitions_are_spaced() {
        let f = fixture(false);
        let word = Word::new("1", "cat", Language::English);
        speak(&f, &word, 3);
        assert_eq!(f.voice.played.borrow().len(), 1);
        f.host.advance(2499);
        assert_eq!(f.voice.played.borrow().len(), 1);
        f.host.advance(1);
        assert_eq!(f.voice.played.borrow().len(), 2);
        f.host.advance(2500);
        assert_eq!(f.voice.played.borrow().len(), 3);
    }

    #[test]
    fn test_cancel_skips_pending_repetitions() {
        let f = fixture(false);
        let word = Word::new("1", "cat", Language::English);
        speak(&f, &word, 3);
        f.gateway.cancel();
        f.host.advance(10_000);
        assert_eq!(f.voice.played.borrow().len(), 1);
        assert!(f.voice.stops.get() >= 2);
    }

    #[test]
    fn test_interrupted_recording_does_not_fall_back_after_cancel() {
        let f = fixture(true);
        f.voice.held_recordings.set(true);
        f.recordings
            .set("1", &Recording {
                data_url: "data:audio/webm;base64,AA==".to_string(),
            })
            .unwrap();
        let word = Word::new("1", "cat", Language::English);
        speak(&f, &word, 1);
        assert_eq!(f.voice.playing.borrow().len(), 1);

        f.gateway.cancel();
        f.host.advance(2000);
        assert_eq!(
            *f.voice.played.borrow(),
            vec!["recording:data:audio/webm;base64,AA==".to_string()]
        );
    }

    #[test]
    fn test_interrupted_recording_falls_back_while_current() {
        let f = fixture(false);
        f.voice.held_recordings.set(true);
        f.recordings
            .set("1", &Recording {
                data_url: "data:audio/webm;base64,AA==".to_string(),
            })
            .unwrap();
        let word = Word::new("1", "cat", Language::English);
        speak(&f, &word, 1);
        // the recording dies without the gateway being cancelled
        f.voice.playing.borrow_mut().clear();
        f.host.run_until_stalled();
        assert_eq!(f.voice.played.borrow().last().unwrap(), "synth:cat");
    }

    #[test]
    fn test_urdu_switches_to_tts_after_device_voice_chances() {
        let f = fixture(true);
        let word = Word::new("1", "دعا", Language::Urdu);
        for _ in 0..5 {
            speak(&f, &word, 1);
        }
        assert_eq!(
            *f.voice.played.borrow(),
            vec!["synth:دعا", "synth:دعا", "synth:دعا", "mp3:3", "mp3:3"]
        );
    }

    #[test]
    fn test_tts_counts_reset_for_a_new_word() {
        let f = fixture(true);
        let first = Word::new("1", "دعا", Language::Urdu);
        let second = Word::new("2", "صفت", Language::Urdu);
        for _ in 0..4 {
            speak(&f, &first, 1);
        }
        speak(&f, &second, 1);
        assert_eq!(f.voice.played.borrow().last().unwrap(), "synth:صفت");
    }

    #[test]
    fn test_arabic_and_unconfigured_urdu_never_use_tts() {
        let f = fixture(false);
        let urdu = Word::new("1", "دعا", Language::Urdu);
        for _ in 0..5 {
            speak(&f, &urdu, 1);
        }
        let g = fixture(true);
        let arabic = Word::new("2", "نهر", Language::Arabic);
        for _ in 0..5 {
            speak(&g, &arabic, 1);
        }
        assert!(f.voice.played.borrow().iter().all(|p| p.starts_with("synth:")));
        assert!(g.voice.played.borrow().iter().all(|p| p.starts_with("synth:")));
    }
}
