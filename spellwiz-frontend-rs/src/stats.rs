//! The performance dashboard, derived from the saved session summaries.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use ledger::PartialAppState;

use crate::session::SessionSummary;

/// Sessions shown individually on the dashboard.
const RECENT_SESSIONS: usize = 10;
/// The trend compares this many newest sessions against the same number before them.
const TREND_WINDOW: usize = 3;
const WEAK_WORDS: usize = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 90.0 => Grade::APlus,
            p if p >= 80.0 => Grade::A,
            p if p >= 70.0 => Grade::B,
            p if p >= 60.0 => Grade::C,
            p if p >= 50.0 => Grade::D,
            _ => Grade::E,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub completion_rate: f64,
    pub total_questions: usize,
    pub total_score: f64,
    pub average_score: f64,
    pub overall_percentage: f64,
    pub trend: Trend,
    pub grade: Grade,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SessionPoint {
    pub id: String,
    pub date: DateTime<Utc>,
    pub score: f64,
    pub total_questions: usize,
    /// Rounded to a whole percent.
    pub percentage: u32,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct WeakWord {
    pub word: String,
    pub count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceOverview {
    /// `None` until a session has been saved.
    pub stats: Option<OverallStats>,
    /// Newest first.
    pub recent: Vec<SessionPoint>,
    /// Most often missed first.
    pub weak_words: Vec<WeakWord>,
}

#[derive(Default)]
pub struct OverviewTally {
    total_sessions: usize,
    completed_sessions: usize,
    total_questions: usize,
    total_score: f64,
    mistakes: BTreeMap<String, u32>,
    /// Newest first.
    recent: VecDeque<SessionSummary>,
}

fn mean_ratio<'a>(sessions: impl Iterator<Item = &'a SessionSummary>) -> Option<f64> {
    let ratios: Vec<f64> = sessions.map(SessionSummary::ratio).collect();
    if ratios.is_empty() {
        return None;
    }
    Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
}

fn trend(recent: &VecDeque<SessionSummary>) -> Trend {
    let newer = mean_ratio(recent.iter().take(TREND_WINDOW)).unwrap_or(0.0);
    let older = mean_ratio(recent.iter().skip(TREND_WINDOW).take(TREND_WINDOW)).unwrap_or(newer);
    if newer > older {
        Trend::Improving
    } else if newer < older {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

impl PartialAppState for PerformanceOverview {
    type Event = SessionSummary;
    type Partial = OverviewTally;

    fn process_event(mut tally: OverviewTally, summary: &SessionSummary) -> OverviewTally {
        tally.total_sessions += 1;
        if summary.completed {
            tally.completed_sessions += 1;
        }
        tally.total_questions += summary.total_questions;
        tally.total_score += summary.score;
        for word in &summary.mistake_words {
            *tally.mistakes.entry(word.clone()).or_default() += 1;
        }
        tally.recent.push_front(summary.clone());
        tally.recent.truncate(RECENT_SESSIONS);
        tally
    }

    fn finalize(tally: OverviewTally) -> Self {
        let mut weak_words: Vec<WeakWord> = tally
            .mistakes
            .into_iter()
            .map(|(word, count)| WeakWord { word, count })
            .collect();
        // stable, so ties stay alphabetical
        weak_words.sort_by(|a, b| b.count.cmp(&a.count));
        weak_words.truncate(WEAK_WORDS);

        let recent = tally
            .recent
            .iter()
            .map(|summary| SessionPoint {
                id: summary.id.clone(),
                date: summary.date,
                score: summary.score,
                total_questions: summary.total_questions,
                percentage: (summary.ratio() * 100.0).round() as u32,
                completed: summary.completed,
            })
            .collect();

        let stats = (tally.total_sessions > 0).then(|| {
            let overall_percentage = if tally.total_questions == 0 {
                0.0
            } else {
                tally.total_score / tally.total_questions as f64 * 100.0
            };
            OverallStats {
                total_sessions: tally.total_sessions,
                completed_sessions: tally.completed_sessions,
                completion_rate: tally.completed_sessions as f64 / tally.total_sessions as f64 * 100.0,
                total_questions: tally.total_questions,
                total_score: tally.total_score,
                average_score: tally.total_score / tally.total_sessions as f64,
                overall_percentage,
                trend: trend(&tally.recent),
                grade: Grade::from_percentage(overall_percentage),
            }
        });

        Self {
            stats,
            recent,
            weak_words,
        }
    }
}
