use crate::text_cleanup::normalize_word_text;
use crate::{Language, Word};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct WordList {
    pub id: String,
    pub name: String,
    pub language: Language,
    pub words: Vec<Word>,
}

impl WordList {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

const ENGLISH_WORDS: &[&str] = &[
    "contemplative", "patient", "remember", "arrogant", "gigantic", "perfume", "competition",
    "February", "children", "grateful", "brave", "world", "hardworking", "calm", "furniture",
    "valley", "academy", "delicious", "sneeze", "etiquette", "benefit", "practice", "cupboard",
    "cricket", "hobbies", "someone", "lanky", "vacation", "flight", "companion",
];

const URDU_WORDS: &[&str] = &[
    "عبادت", "تلاش", "مہمان", "استقبال", "عادت", "گھڑی", "دعا", "ظاہر", "راستہ", "ایمان",
    "مزاج", "خاموش", "طبیعت", "حیران", "لکڑی", "سجدہ", "ڈانٹ", "آسمان", "سورج", "طلوع",
    "بھوک", "صحابہ کرام", "صفت", "ناراض", "تکلیف", "حالت", "خرگوش", "چیونٹی", "جھوٹ", "تعلق",
    "کانپنا", "ہجری", "جفاکش", "ترقی", "اعداد", "فلک", "اعتبار", "جوڑنا", "ارمان", "پریشانی",
    "مسکین", "آہستہ", "گیند", "خوشبودار", "کوشش", "مثال", "جاندار", "میدان", "درہم", "برداشت",
];

const ARABIC_WORDS: &[&str] = &[
    "فأر", "رسالة", "نهر", "خشب", "بيوت", "أصوات", "بندق", "جوز", "الناس", "تسير السيارة",
    "ينظف", "يكنس", "يتعب", "يقفز", "الفلاح", "يضرب", "قوي", "أسنان", "نعامة", "يخرج", "يزار",
    "يخفي", "لامعة", "يدفن", "يحكم", "السجن", "صحراء", "تسافر", "القاضي", "يظهر", "أجزاء",
    "عجلات", "المطاط", "محطة", "علم", "إسعاف", "مطافئ", "البضائع", "اخترع", "أسهل", "يستريح",
    "طريق", "النهر", "القطار", "كتف", "الخشبة", "بعض", "آخر", "لا شيء", "يفهم",
];

fn predefined_words(language: Language) -> &'static [&'static str] {
    match language {
        Language::English => ENGLISH_WORDS,
        Language::Urdu => URDU_WORDS,
        Language::Arabic => ARABIC_WORDS,
    }
}

fn predefined_name(language: Language) -> &'static str {
    match language {
        Language::English => "English Spelling Practice",
        Language::Urdu => "اردو املا کی مشق",
        Language::Arabic => "تدريب الإملاء العربية",
    }
}

/// Word ids are unique across lists as long as list ids are.
fn word_id(list_id: &str, index: usize) -> String {
    format!("{list_id}-{index}")
}

/// The built-in practice list for a language, in its canonical order.
pub fn predefined_word_list(language: Language, list_id: impl Into<String>) -> WordList {
    let list_id = list_id.into();
    let words = predefined_words(language)
        .iter()
        .enumerate()
        .map(|(index, text)| Word::new(word_id(&list_id, index), normalize_word_text(text), language))
        .collect();
    WordList {
        id: list_id,
        name: predefined_name(language).to_string(),
        language,
        words,
    }
}

/// Parse an uploaded list: one word or phrase per line. Blank lines are skipped
/// and ids are assigned in order of appearance.
pub fn parse_word_list(
    list_id: impl Into<String>,
    name: impl Into<String>,
    language: Language,
    text: &str,
) -> WordList {
    let list_id = list_id.into();
    let words = text
        .lines()
        .map(normalize_word_text)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, text)| Word::new(word_id(&list_id, index), text, language))
        .collect();
    WordList {
        id: list_id,
        name: name.into(),
        language,
        words,
    }
}
