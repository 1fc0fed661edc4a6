//! Runs a [`StageMachine`] on a [`Host`].
//!
//! The machine decides, this module carries out: effects become timers, pronunciations and
//! listener calls. Listeners are always called after the machine's borrow is released, so a
//! listener may feed the next input straight back in (for example by moving to the next word).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use language_utils::Word;
use ledger::data_model::flush;
use ledger::{ListenerKey, Listeners};

use crate::cells::NavigationKey;
use crate::config::PracticeConfig;
use crate::context::WordContext;
use crate::host::Host;
use crate::pronunciation::PronunciationGateway;
use crate::stage::{Effect, Input, PracticeEvent, PracticeView, StageMachine};

/// How many times the replay button says the word.
pub const REPLAY_TIMES: u32 = 3;

pub struct Practice {
    this: Weak<Practice>,
    machine: RefCell<StageMachine>,
    host: Rc<dyn Host>,
    gateway: Rc<dyn PronunciationGateway>,
    listeners: RefCell<Listeners<PracticeEvent>>,
    context: WordContext,
    context_key: Cell<Option<ListenerKey>>,
    /// Bumped by every pronunciation request and cancellation.
    speech: Cell<u64>,
}

impl Practice {
    /// Follows `context`: whenever its word changes, practice restarts on the new word.
    pub fn new(
        config: PracticeConfig,
        host: Rc<dyn Host>,
        gateway: Rc<dyn PronunciationGateway>,
        context: &WordContext,
    ) -> Rc<Self> {
        let practice = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            machine: RefCell::new(StageMachine::new(config)),
            host,
            gateway,
            listeners: Default::default(),
            context: context.clone(),
            context_key: Cell::new(None),
            speech: Cell::new(0),
        });

        let weak = Rc::downgrade(&practice);
        let key = context.subscribe(move |_, word| {
            if let Some(practice) = weak.upgrade() {
                practice.follow(word.clone());
            }
        });
        practice.context_key.set(Some(key));
        practice.follow(context.current());
        practice
    }

    fn follow(&self, word: Option<Word>) {
        match word {
            Some(word) => self.dispatch(Input::LoadWord(word)),
            None => self.dispatch(Input::Teardown),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(ListenerKey, &PracticeEvent) + 'static) -> ListenerKey {
        self.listeners.borrow_mut().register(listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.listeners.borrow_mut().unregister(key);
    }

    pub fn view(&self) -> Option<PracticeView> {
        self.machine.borrow().view()
    }

    pub fn dispatch(&self, input: Input) {
        let effects = self.machine.borrow_mut().handle(input, self.host.now_ms());
        self.run(effects);
    }

    pub fn edit(&self, index: usize, value: &str) {
        self.dispatch(Input::Edit {
            index,
            value: value.to_string(),
        });
    }

    pub fn key(&self, index: usize, key: NavigationKey) {
        self.dispatch(Input::Key { index, key });
    }

    pub fn submit(&self) {
        self.dispatch(Input::Submit);
    }

    pub fn next_stage(&self) {
        self.dispatch(Input::NextStage);
    }

    pub fn previous_stage(&self) {
        self.dispatch(Input::PreviousStage);
    }

    pub fn give_up(&self) {
        self.dispatch(Input::GiveUp);
    }

    pub fn pause(&self) {
        self.dispatch(Input::Pause);
    }

    pub fn resume(&self) {
        self.dispatch(Input::Resume);
    }

    /// Says the current word again, [`REPLAY_TIMES`] times.
    pub fn replay(&self) {
        let word = self.machine.borrow().session().map(|s| s.word.clone());
        if let Some(word) = word {
            self.speak(word, REPLAY_TIMES);
        }
    }

    fn run(&self, effects: Vec<Effect>) {
        let mut events = Vec::new();
        for effect in effects {
            match effect {
                Effect::Speak { word, times } => self.speak(word, times),
                Effect::CancelSpeech => {
                    self.speech.set(self.speech.get() + 1);
                    self.gateway.cancel();
                }
                Effect::Schedule { token, after_ms } => {
                    let this = self.this.clone();
                    self.host.schedule(
                        after_ms,
                        Box::new(move || {
                            if let Some(practice) = this.upgrade() {
                                practice.dispatch(Input::Scheduled(token));
                            }
                        }),
                    );
                }
                Effect::Emit(event) => events.push(event),
            }
        }
        for event in events {
            self.emit(&event);
        }
    }

    fn speak(&self, word: Word, times: u32) {
        let speech = self.speech.get() + 1;
        self.speech.set(speech);
        let speaking = self.gateway.speak(&word, times);
        let this = self.this.clone();
        self.host.spawn(Box::pin(async move {
            if let Err(e) = speaking.await {
                log::warn!("Could not pronounce word {}: {e:?}", word.id);
                let current = this.upgrade().filter(|practice| practice.speech.get() == speech);
                if let Some(practice) = current {
                    practice.emit(&PracticeEvent::PronunciationFailed {
                        word_id: word.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }));
    }

    fn emit(&self, event: &PracticeEvent) {
        let notifications = self.listeners.borrow().notifications(event, None);
        flush(notifications);
    }
}

impl Drop for Practice {
    fn drop(&mut self) {
        if let Some(key) = self.context_key.take() {
            self.context.unsubscribe(key);
        }
        self.gateway.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualHost;
    use crate::pronunciation::PronunciationError;
    use crate::stage::Stage;
    use futures::future::LocalBoxFuture;
    use language_utils::Language;

    #[derive(Default)]
    struct RecordingGateway {
        spoken: RefCell<Vec<(String, u32)>>,
        cancels: Cell<u32>,
        fail: Cell<bool>,
    }

    impl PronunciationGateway for RecordingGateway {
        fn speak(&self, word: &Word, times: u32) -> LocalBoxFuture<'static, Result<(), PronunciationError>> {
            self.spoken.borrow_mut().push((word.text.clone(), times));
            let fail = self.fail.get();
            let language = word.language;
            Box::pin(async move {
                if fail {
                    Err(PronunciationError::NoVoice(language))
                } else {
                    Ok(())
                }
            })
        }

        fn cancel(&self) {
            self.cancels.set(self.cancels.get() + 1);
        }
    }

    struct Fixture {
        host: Rc<ManualHost>,
        gateway: Rc<RecordingGateway>,
        context: WordContext,
        practice: Rc<Practice>,
        events: Rc<RefCell<Vec<PracticeEvent>>>,
    }

    fn fixture() -> Fixture {
        let host = Rc::new(ManualHost::new());
        let gateway = Rc::new(RecordingGateway::default());
        let context = WordContext::new();
        let practice = Practice::new(
            PracticeConfig {
                seed: Some(3),
                ..Default::default()
            },
            host.clone(),
            gateway.clone(),
            &context,
        );
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        practice.subscribe(move |_, event| sink.borrow_mut().push(event.clone()));
        Fixture {
            host,
            gateway,
            context,
            practice,
            events,
        }
    }

    fn fill_correctly(practice: &Practice) {
        let view = practice.view().unwrap();
        let expected = view.word.chars();
        for (index, editable) in view.editable.iter().enumerate() {
            if *editable {
                practice.edit(index, &expected[index].to_string());
            }
        }
    }

    #[test]
    fn test_follows_the_word_context() {
        let f = fixture();
        assert!(f.practice.view().is_none());

        f.context.set(Some(Word::new("1", "cat", Language::English)));
        f.host.run_until_stalled();
        assert_eq!(f.practice.view().unwrap().stage, Stage::Memorize);
        assert_eq!(*f.gateway.spoken.borrow(), vec![("cat".to_string(), 1)]);

        f.context.set(None);
        assert!(f.practice.view().is_none());
        assert_eq!(f.gateway.cancels.get(), 1);
    }

    #[test]
    fn test_completes_a_word_on_the_host_clock() {
        let f = fixture();
        f.context.set(Some(Word::new("1", "cat", Language::English)));
        f.practice.next_stage();
        fill_correctly(&f.practice);
        f.host.advance(300 + 1500);
        assert_eq!(f.practice.view().unwrap().stage, Stage::TypeWord);

        fill_correctly(&f.practice);
        f.host.advance(300 + 1500);
        assert_eq!(
            f.events.borrow().last(),
            Some(&PracticeEvent::WordComplete {
                word_id: "1".to_string(),
                correct: true,
                penalty: 0.0
            })
        );
    }

    #[test]
    fn test_timer_ticks_reach_listeners() {
        let f = fixture();
        f.context.set(Some(Word::new("1", "cat", Language::English)));
        f.host.advance(3000);
        let ticks: Vec<u32> = f
            .events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                PracticeEvent::TimerTick { remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![29, 28, 27]);
    }

    #[test]
    fn test_listener_can_move_to_the_next_word() {
        let f = fixture();
        let context = f.context.clone();
        f.practice.subscribe(move |_, event| {
            if let PracticeEvent::WordComplete { .. } = event {
                context.set(Some(Word::new("2", "dog", Language::English)));
            }
        });
        f.context.set(Some(Word::new("1", "cat", Language::English)));
        f.practice.give_up();
        assert_eq!(f.practice.view().unwrap().word.text, "dog");
    }

    #[test]
    fn test_pronunciation_failure_is_reported_not_fatal() {
        let f = fixture();
        f.gateway.fail.set(true);
        f.context.set(Some(Word::new("1", "دعا", Language::Urdu)));
        f.host.run_until_stalled();
        assert!(f.events.borrow().iter().any(|e| matches!(
            e,
            PracticeEvent::PronunciationFailed { word_id, .. } if word_id == "1"
        )));
        f.practice.next_stage();
        assert_eq!(f.practice.view().unwrap().stage, Stage::FillBlanks);
    }

    #[test]
    fn test_failures_of_abandoned_pronunciations_are_not_reported() {
        let f = fixture();
        f.gateway.fail.set(true);
        f.context.set(Some(Word::new("1", "cat", Language::English)));
        f.context.set(Some(Word::new("2", "dog", Language::English)));
        f.host.run_until_stalled();
        let failed: Vec<String> = f
            .events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                PracticeEvent::PronunciationFailed { word_id, .. } => Some(word_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(failed, vec!["2".to_string()]);
    }

    #[test]
    fn test_replay_says_the_word_three_times() {
        let f = fixture();
        f.practice.replay();
        assert!(f.gateway.spoken.borrow().is_empty());
        f.context.set(Some(Word::new("1", "cat", Language::English)));
        f.practice.replay();
        assert_eq!(f.gateway.spoken.borrow().last(), Some(&("cat".to_string(), 3)));
    }

    #[test]
    fn test_dropping_stops_following_the_context() {
        let f = fixture();
        let Fixture {
            practice, context, ..
        } = f;
        drop(practice);
        context.set(Some(Word::new("1", "cat", Language::English)));
    }
}
