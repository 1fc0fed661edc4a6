pub mod text_cleanup;
pub mod word_list;

pub use word_list::{WordList, parse_word_list, predefined_word_list};

#[derive(
    Copy,
    Clone,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    Hash,
    tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Urdu,
    Arabic,
}

#[derive(Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum WritingSystem {
    /// Latin alphabet
    Latin,
    /// Arabic script, including the Urdu (Nastaliq) extensions
    Arabic,
}

#[derive(Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum TextDirection {
    LeftToRight,
    RightToLeft,
}

impl Language {
    pub fn iso_639_3(&self) -> &str {
        match self {
            Language::English => "eng",
            Language::Urdu => "urd",
            Language::Arabic => "ara",
        }
    }

    pub fn iso_639_1(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Urdu => "ur",
            Language::Arabic => "ar",
        }
    }

    /// BCP 47 tag handed to speech synthesis.
    pub fn speech_locale(&self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Urdu => "ur-PK",
            Language::Arabic => "ar-SA",
        }
    }

    pub fn writing_system(&self) -> WritingSystem {
        match self {
            Language::English => WritingSystem::Latin,
            Language::Urdu | Language::Arabic => WritingSystem::Arabic,
        }
    }

    pub fn direction(&self) -> TextDirection {
        match self.writing_system() {
            WritingSystem::Latin => TextDirection::LeftToRight,
            WritingSystem::Arabic => TextDirection::RightToLeft,
        }
    }

    pub fn is_rtl(&self) -> bool {
        self.direction() == TextDirection::RightToLeft
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => write!(f, "English"),
            Language::Urdu => write!(f, "Urdu"),
            Language::Arabic => write!(f, "Arabic"),
        }
    }
}

pub const LANGUAGES: &[Language] = &[Language::English, Language::Urdu, Language::Arabic];

/// A single word to practice. Words are never mutated once loaded.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Word {
    pub id: String,
    pub text: String,
    pub language: Language,
}

impl Word {
    pub fn new(id: impl Into<String>, text: impl Into<String>, language: Language) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            language,
        }
    }

    /// The word split into one entry per input cell.
    pub fn chars(&self) -> Vec<char> {
        self.text.chars().collect()
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_rtl(&self) -> bool {
        self.language.is_rtl()
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum TtsProvider {
    ElevenLabs,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct TtsRequest {
    pub text: String,
    pub language: Language,
}
