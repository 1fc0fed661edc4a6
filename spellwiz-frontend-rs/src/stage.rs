//! The per-word practice state machine.
//!
//! A word is practiced in three stages: the learner first sees the whole word (memorize), then
//! fills in hidden letters, then types the whole word from memory. Failing the blanks retries the
//! blanks with a new pattern; failing the typing sends the learner back to memorize.
//!
//! [`StageMachine::handle`] is a reducer: it takes an [`Input`] and the current time and returns
//! the [`Effect`]s the host must carry out. It never sleeps, speaks or calls back on its own.
//! Anything delayed is requested with [`Effect::Schedule`] and comes back later as
//! [`Input::Scheduled`]. Tokens from superseded stages or words are recognized and dropped.

use language_utils::Word;
use rand_chacha::ChaCha8Rng;

use crate::blanks;
use crate::cells::{CellGrid, NavigationKey};
use crate::checker::{check_blanks, check_full};
use crate::config::PracticeConfig;
use crate::penalty::Attempts;
use crate::timer::{StageTimer, TimerSignal, Wakeup};

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Stage {
    Memorize,
    FillBlanks,
    TypeWord,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Memorize => Some(Stage::FillBlanks),
            Stage::FillBlanks => Some(Stage::TypeWord),
            Stage::TypeWord => None,
        }
    }

    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Memorize => None,
            Stage::FillBlanks => Some(Stage::Memorize),
            Stage::TypeWord => Some(Stage::FillBlanks),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum IncorrectReason {
    /// Some cells were left empty.
    Incomplete,
    /// Every cell was filled but the spelling is wrong.
    Wrong,
    /// The countdown ran out before a correct answer.
    TimedOut,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PracticeEvent {
    #[serde(rename_all = "camelCase")]
    StageChanged { word_id: String, stage: Stage },
    #[serde(rename_all = "camelCase")]
    IncorrectAttempt {
        word_id: String,
        stage: Stage,
        reason: IncorrectReason,
        attempt_count: u32,
        penalty: f64,
    },
    #[serde(rename_all = "camelCase")]
    Celebration { word_id: String, stage: Stage },
    #[serde(rename_all = "camelCase")]
    WordComplete {
        word_id: String,
        correct: bool,
        penalty: f64,
    },
    TimerTick { remaining: u32 },
    TimerWarning { remaining: u32 },
    /// Speaking failed. Practice carries on regardless.
    #[serde(rename_all = "camelCase")]
    PronunciationFailed { word_id: String, message: String },
}

/// Identifies a delayed callback so that stale ones can be told apart from current ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scheduled {
    TimerTick { generation: u64 },
    AutoCheck { epoch: u64, revision: u64 },
    CelebrationDone { epoch: u64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    LoadWord(Word),
    Edit { index: usize, value: String },
    Key { index: usize, key: NavigationKey },
    Submit,
    NextStage,
    PreviousStage,
    /// Abandon the word; it completes as incorrect with the penalty accrued so far.
    GiveUp,
    Pause,
    Resume,
    Scheduled(Scheduled),
    Teardown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Speak { word: Word, times: u32 },
    CancelSpeech,
    Schedule { token: Scheduled, after_ms: u64 },
    Emit(PracticeEvent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct TimerKey {
    word_id: String,
    entry: u32,
}

/// Everything about the word currently being practiced. Discarded whenever the word changes.
#[derive(Clone, Debug, PartialEq)]
pub struct StageSession {
    pub word: Word,
    pub stage: Stage,
    /// Sorted; empty outside the fill-in-the-blanks stage.
    pub blank_indices: Vec<usize>,
    pub cells: CellGrid,
    pub attempts: Attempts,
    pub time_remaining: u32,
    /// True between a correct answer and the transition it triggers.
    pub is_correct: bool,
    pub finished: bool,
    manually_changed: bool,
    entry: u32,
}

impl StageSession {
    fn new(word: Word, stage_seconds: u32) -> Self {
        let cells = CellGrid::full(&word.chars(), word.language.direction());
        Self {
            word,
            stage: Stage::Memorize,
            blank_indices: Vec::new(),
            cells,
            attempts: Attempts::default(),
            time_remaining: stage_seconds,
            is_correct: false,
            finished: false,
            manually_changed: false,
            entry: 0,
        }
    }

    fn accepts_answers(&self) -> bool {
        self.stage != Stage::Memorize && !self.is_correct && !self.finished
    }
}

/// A snapshot for rendering.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct PracticeView {
    pub word: Word,
    pub stage: Stage,
    pub blank_indices: Vec<usize>,
    pub cells: Vec<Option<char>>,
    pub editable: Vec<bool>,
    pub cursor: Option<usize>,
    pub attempt_count: u32,
    pub penalty: f64,
    pub time_remaining: u32,
    pub is_correct: bool,
    pub paused: bool,
    pub finished: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Trigger {
    Submit,
    AutoCheck,
    Timeout,
}

pub struct StageMachine {
    config: PracticeConfig,
    rng: ChaCha8Rng,
    session: Option<StageSession>,
    timer: StageTimer<TimerKey>,
    /// Bumped on every stage entry, word change and teardown.
    epoch: u64,
    /// Bumped on every edit.
    revision: u64,
    last_load: Option<(String, u64)>,
    paused: bool,
}

impl StageMachine {
    pub fn new(config: PracticeConfig) -> Self {
        let rng = config.rng();
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: PracticeConfig, rng: ChaCha8Rng) -> Self {
        let timer = StageTimer::new(config.stage_seconds, config.warning_seconds);
        Self {
            config,
            rng,
            session: None,
            timer,
            epoch: 0,
            revision: 0,
            last_load: None,
            paused: false,
        }
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&StageSession> {
        self.session.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn view(&self) -> Option<PracticeView> {
        let session = self.session.as_ref()?;
        Some(PracticeView {
            word: session.word.clone(),
            stage: session.stage,
            blank_indices: session.blank_indices.clone(),
            cells: session.cells.slots().to_vec(),
            editable: (0..session.cells.slots().len())
                .map(|i| session.cells.is_editable(i))
                .collect(),
            cursor: session.cells.cursor(),
            attempt_count: session.attempts.count,
            penalty: session.attempts.penalty,
            time_remaining: session.time_remaining,
            is_correct: session.is_correct,
            paused: self.paused,
            finished: session.finished,
        })
    }

    pub fn handle(&mut self, input: Input, now_ms: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            Input::LoadWord(word) => self.load_word(word, now_ms, &mut effects),
            Input::Edit { index, value } => self.edit(index, &value, &mut effects),
            Input::Key { index, key } => {
                if let Some(session) = self.session.as_mut() {
                    session.cells.key(index, key);
                }
            }
            Input::Submit => self.evaluate(Trigger::Submit, now_ms, &mut effects),
            Input::NextStage => self.navigate(Stage::next, now_ms, &mut effects),
            Input::PreviousStage => self.navigate(Stage::previous, now_ms, &mut effects),
            Input::GiveUp => self.give_up(&mut effects),
            Input::Pause => {
                self.timer.pause(now_ms);
                self.paused = self.timer.is_paused();
            }
            Input::Resume => {
                if let Some(wakeup) = self.timer.resume(now_ms) {
                    schedule_tick(wakeup, &mut effects);
                }
                self.paused = false;
            }
            Input::Scheduled(token) => self.scheduled(token, now_ms, &mut effects),
            Input::Teardown => self.teardown(&mut effects),
        }
        effects
    }

    fn load_word(&mut self, word: Word, now_ms: u64, effects: &mut Vec<Effect>) {
        let window = u64::from(self.config.word_change_window_ms);
        if let Some((last_id, at)) = &self.last_load {
            let same_as_current = self
                .session
                .as_ref()
                .is_some_and(|s| s.word == word && !s.finished);
            if *last_id == word.id && same_as_current && now_ms.saturating_sub(*at) < window {
                log::debug!("Ignoring repeated load of word {} within {window}ms", word.id);
                return;
            }
        }

        log::info!("Practicing word {} ({})", word.id, word.language);
        self.teardown(effects);
        self.last_load = Some((word.id.clone(), now_ms));
        self.session = Some(StageSession::new(word, self.config.stage_seconds));
        self.enter_stage(Stage::Memorize, now_ms, effects);
    }

    fn teardown(&mut self, effects: &mut Vec<Effect>) {
        self.timer.stop();
        self.epoch += 1;
        self.paused = false;
        if self.session.take().is_some() {
            effects.push(Effect::CancelSpeech);
        }
    }

    /// (Re-)enters `stage` with fresh cells, a restarted countdown, and one pronunciation.
    fn enter_stage(&mut self, stage: Stage, now_ms: u64, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.epoch += 1;
        self.paused = false;

        let chars = session.word.chars();
        let direction = session.word.language.direction();
        session.stage = stage;
        session.entry += 1;
        session.is_correct = false;
        session.manually_changed = false;
        session.time_remaining = self.config.stage_seconds;
        match stage {
            Stage::FillBlanks => {
                session.blank_indices = blanks::generate(&chars, &mut self.rng);
                session.cells = CellGrid::with_blanks(&chars, &session.blank_indices, direction);
            }
            Stage::Memorize | Stage::TypeWord => {
                session.blank_indices.clear();
                session.cells = CellGrid::full(&chars, direction);
            }
        }
        log::debug!(
            "Word {} entered {stage:?} (entry {}, blanks {:?})",
            session.word.id,
            session.entry,
            session.blank_indices
        );

        let key = TimerKey {
            word_id: session.word.id.clone(),
            entry: session.entry,
        };
        let word = session.word.clone();
        if let Some(wakeup) = self.timer.start(key, now_ms) {
            schedule_tick(wakeup, effects);
        }
        effects.push(Effect::Speak {
            word: word.clone(),
            times: 1,
        });
        effects.push(Effect::Emit(PracticeEvent::StageChanged {
            word_id: word.id,
            stage,
        }));
    }

    fn edit(&mut self, index: usize, value: &str, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.accepts_answers() || !session.cells.edit(index, value) {
            return;
        }
        session.manually_changed = true;
        self.revision += 1;

        if self.config.auto_check && session.cells.is_complete() {
            effects.push(Effect::Schedule {
                token: Scheduled::AutoCheck {
                    epoch: self.epoch,
                    revision: self.revision,
                },
                after_ms: u64::from(self.config.auto_check_debounce_ms),
            });
        }
    }

    fn evaluate(&mut self, trigger: Trigger, now_ms: u64, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if !session.accepts_answers() {
            return;
        }

        let slots = session.cells.slots();
        let (passed, untouched) = match session.stage {
            Stage::FillBlanks => {
                let check = check_blanks(&session.word, slots, &session.blank_indices);
                (check.passed(), check.untouched())
            }
            Stage::TypeWord => (
                check_full(&session.word, slots),
                session.cells.is_untouched(),
            ),
            Stage::Memorize => return,
        };

        if passed {
            self.succeed(effects);
            return;
        }

        let reason = if trigger == Trigger::Timeout {
            IncorrectReason::TimedOut
        } else if untouched || !session.cells.is_complete() {
            IncorrectReason::Incomplete
        } else {
            IncorrectReason::Wrong
        };
        self.fail(reason, now_ms, effects);
    }

    fn succeed(&mut self, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.is_correct = true;
        self.timer.stop();
        self.epoch += 1;
        log::info!("Word {} correct in {:?}", session.word.id, session.stage);

        effects.push(Effect::Emit(PracticeEvent::Celebration {
            word_id: session.word.id.clone(),
            stage: session.stage,
        }));
        effects.push(Effect::Schedule {
            token: Scheduled::CelebrationDone { epoch: self.epoch },
            after_ms: u64::from(self.config.celebration_ms),
        });
    }

    fn fail(&mut self, reason: IncorrectReason, now_ms: u64, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.attempts = session.attempts.on_failure();
        log::info!(
            "Word {} incorrect in {:?} ({reason:?}), penalty now {}",
            session.word.id,
            session.stage,
            session.attempts.penalty
        );
        effects.push(Effect::Emit(PracticeEvent::IncorrectAttempt {
            word_id: session.word.id.clone(),
            stage: session.stage,
            reason,
            attempt_count: session.attempts.count,
            penalty: session.attempts.penalty,
        }));

        let retry = match session.stage {
            Stage::FillBlanks => Stage::FillBlanks,
            Stage::TypeWord | Stage::Memorize => Stage::Memorize,
        };
        self.enter_stage(retry, now_ms, effects);
    }

    fn navigate(
        &mut self,
        step: fn(Stage) -> Option<Stage>,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.is_correct || session.finished {
            return;
        }
        if let Some(target) = step(session.stage) {
            self.enter_stage(target, now_ms, effects);
        }
    }

    fn give_up(&mut self, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.finished {
            return;
        }
        session.finished = true;
        session.is_correct = false;
        self.timer.stop();
        self.epoch += 1;
        effects.push(Effect::CancelSpeech);
        effects.push(Effect::Emit(PracticeEvent::WordComplete {
            word_id: session.word.id.clone(),
            correct: false,
            penalty: session.attempts.penalty,
        }));
    }

    fn scheduled(&mut self, token: Scheduled, now_ms: u64, effects: &mut Vec<Effect>) {
        match token {
            Scheduled::TimerTick { generation } => {
                let (signals, next) = self.timer.on_wakeup(generation);
                if let Some(next) = next {
                    schedule_tick(next, effects);
                }
                for signal in signals {
                    self.timer_signal(signal, now_ms, effects);
                }
            }
            Scheduled::AutoCheck { epoch, revision } => {
                if epoch != self.epoch || revision != self.revision {
                    return;
                }
                let ready = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.manually_changed && s.cells.is_complete());
                if ready {
                    self.evaluate(Trigger::AutoCheck, now_ms, effects);
                }
            }
            Scheduled::CelebrationDone { epoch } => {
                if epoch != self.epoch {
                    return;
                }
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if !session.is_correct {
                    return;
                }
                match session.stage {
                    Stage::FillBlanks => self.enter_stage(Stage::TypeWord, now_ms, effects),
                    Stage::TypeWord => {
                        session.is_correct = false;
                        session.finished = true;
                        effects.push(Effect::Emit(PracticeEvent::WordComplete {
                            word_id: session.word.id.clone(),
                            correct: true,
                            penalty: session.attempts.penalty,
                        }));
                    }
                    Stage::Memorize => {}
                }
            }
        }
    }

    fn timer_signal(&mut self, signal: TimerSignal, now_ms: u64, effects: &mut Vec<Effect>) {
        match signal {
            TimerSignal::Tick { remaining } => {
                if let Some(session) = self.session.as_mut() {
                    session.time_remaining = remaining;
                }
                effects.push(Effect::Emit(PracticeEvent::TimerTick { remaining }));
            }
            TimerSignal::Warning { remaining } => {
                effects.push(Effect::Emit(PracticeEvent::TimerWarning { remaining }));
            }
            TimerSignal::Expired => {
                let Some(stage) = self.session.as_ref().map(|s| s.stage) else {
                    return;
                };
                log::info!("Time ran out in {stage:?}");
                match stage {
                    Stage::Memorize => self.enter_stage(Stage::FillBlanks, now_ms, effects),
                    Stage::FillBlanks | Stage::TypeWord => {
                        self.evaluate(Trigger::Timeout, now_ms, effects)
                    }
                }
            }
        }
    }
}

fn schedule_tick(wakeup: Wakeup, effects: &mut Vec<Effect>) {
    effects.push(Effect::Schedule {
        token: Scheduled::TimerTick {
            generation: wakeup.generation,
        },
        after_ms: wakeup.after_ms,
    });
}
