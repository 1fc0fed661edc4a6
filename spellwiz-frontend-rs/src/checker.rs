//! Answer checking.
//!
//! Right-to-left scripts are compared letter by letter with no case folding, because
//! Arabic-script letters have no case and visually similar letters are distinct.
//! Latin-script words are compared as whole strings, ignoring case.

use language_utils::Word;

/// A slot is filled when it holds a visible character, or whitespace where the word has whitespace.
fn slot_filled(slot: Option<char>, expected: Option<char>) -> bool {
    match slot {
        None => false,
        Some(c) if c.is_whitespace() => expected.is_some_and(char::is_whitespace),
        Some(_) => true,
    }
}

fn joined_lowercase(attempt: &[Option<char>]) -> String {
    attempt.iter().flatten().collect::<String>().to_lowercase()
}

pub fn check_full(word: &Word, attempt: &[Option<char>]) -> bool {
    let expected = word.chars();
    if attempt.len() != expected.len() {
        return false;
    }
    let all_filled = attempt
        .iter()
        .zip(&expected)
        .all(|(slot, expected)| slot_filled(*slot, Some(*expected)));
    if !all_filled {
        return false;
    }

    if word.is_rtl() {
        attempt
            .iter()
            .zip(&expected)
            .all(|(slot, expected)| *slot == Some(*expected))
    } else {
        joined_lowercase(attempt) == word.text.to_lowercase()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlankCheck {
    pub all_correct: bool,
    /// At least one blank holds something.
    pub any_filled: bool,
    pub blank_count: usize,
}

impl BlankCheck {
    /// Words too short to have blanks pass on a correct attempt alone.
    pub fn passed(&self) -> bool {
        self.all_correct && (self.any_filled || self.blank_count == 0)
    }

    /// Nothing was attempted at all.
    pub fn untouched(&self) -> bool {
        !self.any_filled && self.blank_count > 0
    }
}

pub fn check_blanks(word: &Word, attempt: &[Option<char>], blanks: &[usize]) -> BlankCheck {
    let expected = word.chars();
    let slot = |index: usize| attempt.get(index).copied().flatten();
    let filled = |index: usize| slot_filled(slot(index), expected.get(index).copied());

    let any_filled = blanks.iter().any(|&index| filled(index));
    let all_filled = blanks.iter().all(|&index| filled(index));

    let all_correct = if attempt.len() != expected.len() || !all_filled {
        false
    } else if word.is_rtl() {
        blanks
            .iter()
            .all(|&index| slot(index) == expected.get(index).copied())
    } else {
        joined_lowercase(attempt) == word.text.to_lowercase()
    };

    BlankCheck {
        all_correct,
        any_filled,
        blank_count: blanks.len(),
    }
}
