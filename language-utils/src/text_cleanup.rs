//! Character-level helpers shared by the blank generator, the answer checker
//! and the input cells.

use unicode_normalization::UnicodeNormalization;

pub const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', 'A', 'E', 'I', 'O', 'U'];

pub fn is_vowel(c: char) -> bool {
    VOWELS.contains(&c)
}

/// ASCII letters that are not vowels. Non-Latin letters are neither vowels nor consonants.
pub fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !is_vowel(c)
}

/// Reduce whatever a single input cell received (a paste, an IME composition,
/// a combining sequence) to the one character the cell holds.
pub fn normalize_cell_input(input: &str) -> Option<char> {
    input.chars().next()
}

/// A slot is blank when it holds nothing or only whitespace.
pub fn is_blank_slot(slot: Option<char>) -> bool {
    slot.is_none_or(char::is_whitespace)
}

/// Canonical form for word text loaded from lists: trimmed and NFC-composed,
/// so that precomposed and decomposed Arabic-script letters compare equal.
pub fn normalize_word_text(text: &str) -> String {
    text.trim().nfc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vowels_and_consonants() {
        assert!(is_vowel('a'));
        assert!(is_vowel('U'));
        assert!(!is_vowel('y'));
        assert!(is_consonant('y'));
        assert!(is_consonant('T'));
        assert!(!is_consonant('e'));
        assert!(!is_consonant('ب'));
        assert!(!is_consonant('-'));
    }

    #[test]
    fn test_normalize_cell_input_keeps_first_char() {
        assert_eq!(normalize_cell_input("ab"), Some('a'));
        assert_eq!(normalize_cell_input("ہم"), Some('ہ'));
        assert_eq!(normalize_cell_input(""), None);
    }

    #[test]
    fn test_blank_slots() {
        assert!(is_blank_slot(None));
        assert!(is_blank_slot(Some(' ')));
        assert!(!is_blank_slot(Some('x')));
    }

    #[test]
    fn test_normalize_word_text() {
        // alef + combining hamza above composes to U+0623
        assert_eq!(normalize_word_text(" \u{0627}\u{0654}سنان "), "\u{0623}سنان");
        assert_eq!(normalize_word_text("cat\n"), "cat");
    }
}
