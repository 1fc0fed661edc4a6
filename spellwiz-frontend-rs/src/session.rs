//! A practice session over one word list: word order, scoring, and the saved summary.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use language_utils::{Word, WordList};
use ledger::{Event, EventLog};
use rand::Rng;
use rand::seq::SliceRandom as _;

use crate::penalty::MAX_PENALTY;

pub const RESULTS_STORAGE_KEY: &str = "spellingWizResults";

/// Added to a word's session penalty when it is given up on, or skipped after a try.
pub const SESSION_PENALTY_STEP: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub date: DateTime<Utc>,
    pub score: f64,
    pub total_questions: usize,
    /// The list's display name.
    pub word_list: String,
    pub mistake_words: Vec<String>,
    /// Older summaries don't have this field; they were all completed sessions.
    #[serde(default = "completed_by_default")]
    pub completed: bool,
}

fn completed_by_default() -> bool {
    true
}

impl SessionSummary {
    /// Score as a fraction of the questions asked.
    pub fn ratio(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.score / self.total_questions as f64
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "version")]
enum VersionedSessionSummary {
    V1(SessionSummary),
}

impl From<SessionSummary> for VersionedSessionSummary {
    fn from(summary: SessionSummary) -> Self {
        Self::V1(summary)
    }
}

impl From<VersionedSessionSummary> for SessionSummary {
    fn from(versioned: VersionedSessionSummary) -> Self {
        match versioned {
            VersionedSessionSummary::V1(summary) => summary,
        }
    }
}

impl Event for SessionSummary {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(VersionedSessionSummary::from(self.clone()))
    }

    /// Accepts versioned entries as well as the unversioned ones written before versioning.
    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match serde_json::from_value::<VersionedSessionSummary>(json.clone()) {
            Ok(versioned) => Ok(versioned.into()),
            Err(e) if json.get("version").is_some() => Err(e),
            Err(_) => serde_json::from_value(json.clone()),
        }
    }
}

/// How the learner has fared with one word of the list during this session.
#[derive(Copy, Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct WordAttempt {
    pub completed: bool,
    pub attempts: u32,
    pub penalty: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
    /// Practice the same word again.
    Stay,
    Moved,
    Finished(SessionSummary),
}

/// Orders the list so the words missed most often in past sessions come first.
/// Words missed equally often (including never) appear in random order.
pub fn prioritize_weak_words<R: Rng + ?Sized>(
    list: &WordList,
    history: &EventLog<SessionSummary>,
    rng: &mut R,
) -> WordList {
    let mut words = list.words.clone();
    words.shuffle(rng);

    if history.is_empty() {
        log::info!("No session history, practicing {} in random order", list.name);
    } else {
        let mut mistakes: HashMap<&str, usize> = HashMap::new();
        for summary in history.iter() {
            for word in &summary.mistake_words {
                *mistakes.entry(word.as_str()).or_default() += 1;
            }
        }
        log::debug!("Mistake frequency: {mistakes:?}");
        // stable, so the shuffle decides ties
        words.sort_by_key(|word| Reverse(mistakes.get(word.text.as_str()).copied().unwrap_or(0)));
    }

    WordList {
        words,
        ..list.clone()
    }
}

#[derive(Clone, Debug)]
pub struct SpellingSession {
    list: WordList,
    index: usize,
    score: f64,
    mistake_words: Vec<String>,
    attempts: BTreeMap<usize, WordAttempt>,
}

impl SpellingSession {
    /// `None` for an empty list.
    pub fn start<R: Rng + ?Sized>(
        list: &WordList,
        history: &EventLog<SessionSummary>,
        rng: &mut R,
    ) -> Option<Self> {
        if list.is_empty() {
            log::warn!("Word list {} is empty, nothing to practice", list.id);
            return None;
        }
        let list = prioritize_weak_words(list, history, rng);
        log::info!("Starting session on {} ({} words)", list.name, list.len());
        Some(Self {
            list,
            index: 0,
            score: 0.0,
            mistake_words: Vec::new(),
            attempts: BTreeMap::new(),
        })
    }

    pub fn list(&self) -> &WordList {
        &self.list
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn mistake_words(&self) -> &[String] {
        &self.mistake_words
    }

    pub fn attempt(&self, index: usize) -> Option<WordAttempt> {
        self.attempts.get(&index).copied()
    }

    pub fn current_word(&self) -> Option<&Word> {
        self.list.words.get(self.index)
    }

    fn is_last(&self) -> bool {
        self.index + 1 >= self.list.len()
    }

    /// Records the outcome of the current word and moves on if it was spelled correctly.
    /// A word only scores the first time it is completed.
    pub fn word_complete(&mut self, correct: bool, penalty: f64, now_ms: u64) -> Progress {
        let Some(word) = self.current_word().cloned() else {
            return Progress::Stay;
        };
        let attempt = self.attempt(self.index).unwrap_or_default();

        if !correct {
            let penalty = (attempt.penalty + SESSION_PENALTY_STEP).min(MAX_PENALTY);
            log::info!("Word {} not completed, session penalty now {penalty}", word.id);
            self.attempts.insert(
                self.index,
                WordAttempt {
                    completed: false,
                    attempts: attempt.attempts + 1,
                    penalty,
                },
            );
            return Progress::Stay;
        }

        if !attempt.completed {
            // only mistakes made while spelling the word mark it as missed
            if penalty > 0.0 && !self.mistake_words.contains(&word.text) {
                self.mistake_words.push(word.text.clone());
            }
            let penalty = attempt.penalty.max(penalty);
            self.score += 1.0 - penalty;
            self.attempts.insert(
                self.index,
                WordAttempt {
                    completed: true,
                    attempts: attempt.attempts + 1,
                    penalty,
                },
            );
        }

        if self.is_last() {
            return Progress::Finished(self.summary(true, now_ms));
        }
        self.index += 1;
        Progress::Moved
    }

    /// Moves within the list. Leaving a word that was tried but never completed costs
    /// [`SESSION_PENALTY_STEP`], charged when the word is eventually completed.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        if let Some(attempt) = self.attempts.get_mut(&self.index) {
            if !attempt.completed && attempt.attempts > 0 {
                attempt.penalty = (attempt.penalty + SESSION_PENALTY_STEP).min(MAX_PENALTY);
                log::info!("Word {} skipped, session penalty now {}", self.index, attempt.penalty);
            }
        }

        match direction {
            Direction::Next if !self.is_last() => self.index += 1,
            Direction::Previous if self.index > 0 => self.index -= 1,
            _ => return false,
        }
        true
    }

    /// The summary to save. Sessions ended early count the words reached so far.
    pub fn summary(&self, completed: bool, now_ms: u64) -> SessionSummary {
        let total_questions = if completed {
            self.list.len()
        } else {
            self.index + 1
        };
        let date = i64::try_from(now_ms)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_default();
        SessionSummary {
            id: now_ms.to_string(),
            date,
            score: self.score,
            total_questions,
            word_list: self.list.name.clone(),
            mistake_words: self.mistake_words.clone(),
            completed,
        }
    }
}
