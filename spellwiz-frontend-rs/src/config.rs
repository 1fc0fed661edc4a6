use language_utils::Language;

/// Tunables for a practice session. Every field has a default, so hosts can pass `{}`
/// or override just the fields they care about.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct PracticeConfig {
    /// Length of every stage's countdown.
    pub stage_seconds: u32,
    /// The timer warns when it crosses into this many seconds remaining.
    pub warning_seconds: u32,
    /// Check automatically once every editable cell is filled.
    pub auto_check: bool,
    pub auto_check_debounce_ms: u32,
    /// How long the celebration shows before the next stage (or word) begins.
    pub celebration_ms: u32,
    /// Repeated word-change notifications for the same word inside this window are ignored.
    pub word_change_window_ms: u32,
    /// Gap between repetitions when a word is spoken more than once.
    pub repeat_delay_ms: u32,
    pub urdu_repeat_delay_ms: u32,
    /// Fixes every random choice (blank patterns, word order) for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            stage_seconds: 30,
            warning_seconds: 5,
            auto_check: true,
            auto_check_debounce_ms: 300,
            celebration_ms: 1500,
            word_change_window_ms: 500,
            repeat_delay_ms: 2500,
            urdu_repeat_delay_ms: 4000,
            seed: None,
        }
    }
}

impl PracticeConfig {
    pub fn repeat_delay_ms(&self, language: Language) -> u32 {
        match language {
            Language::Urdu => self.urdu_repeat_delay_ms,
            Language::English | Language::Arabic => self.repeat_delay_ms,
        }
    }

    pub fn rng(&self) -> rand_chacha::ChaCha8Rng {
        use rand::SeedableRng as _;
        match self.seed {
            Some(seed) => rand_chacha::ChaCha8Rng::seed_from_u64(seed),
            None => rand_chacha::ChaCha8Rng::from_entropy(),
        }
    }
}
