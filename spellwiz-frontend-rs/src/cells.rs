//! The row of single-letter inputs a learner types into.
//!
//! Cells are indexed in reading order for every script. Only arrow keys care about
//! direction: they move visually, so right-to-left words mirror them.

use language_utils::TextDirection;
use language_utils::text_cleanup::normalize_cell_input;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum NavigationKey {
    ArrowLeft,
    ArrowRight,
    Backspace,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellGrid {
    expected: Vec<char>,
    slots: Vec<Option<char>>,
    editable: Vec<bool>,
    cursor: Option<usize>,
    direction: TextDirection,
}

impl CellGrid {
    /// Every cell empty and editable, except whitespace between the words of a phrase.
    pub fn full(expected: &[char], direction: TextDirection) -> Self {
        let editable: Vec<bool> = expected.iter().map(|c| !c.is_whitespace()).collect();
        Self::build(expected, editable, direction)
    }

    /// Only the `blanks` are editable; every other cell shows its letter.
    pub fn with_blanks(expected: &[char], blanks: &[usize], direction: TextDirection) -> Self {
        let editable = (0..expected.len()).map(|i| blanks.contains(&i)).collect();
        Self::build(expected, editable, direction)
    }

    fn build(expected: &[char], editable: Vec<bool>, direction: TextDirection) -> Self {
        let slots = expected
            .iter()
            .zip(&editable)
            .map(|(c, editable)| if *editable { None } else { Some(*c) })
            .collect();
        let cursor = editable.iter().position(|e| *e);
        Self {
            expected: expected.to_vec(),
            slots,
            editable,
            cursor,
            direction,
        }
    }

    pub fn slots(&self) -> &[Option<char>] {
        &self.slots
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    pub fn is_editable(&self, index: usize) -> bool {
        self.editable.get(index).copied().unwrap_or(false)
    }

    pub fn editable_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.editable
            .iter()
            .enumerate()
            .filter(|(_, e)| **e)
            .map(|(i, _)| i)
    }

    fn filled(&self, index: usize) -> bool {
        match self.slots.get(index).copied().flatten() {
            None => false,
            Some(c) if c.is_whitespace() => self.expected.get(index).is_some_and(|e| e.is_whitespace()),
            Some(_) => true,
        }
    }

    /// Every editable cell holds something.
    pub fn is_complete(&self) -> bool {
        self.editable_indices().all(|i| self.filled(i))
    }

    pub fn is_untouched(&self) -> bool {
        self.editable_indices().all(|i| self.slots[i].is_none())
    }

    /// Writes the first character of `input` into an editable cell (or clears it if `input`
    /// is empty). Returns false if the cell is locked or out of range.
    pub fn edit(&mut self, index: usize, input: &str) -> bool {
        if !self.is_editable(index) {
            return false;
        }
        let value = normalize_cell_input(input);
        self.slots[index] = value;
        self.cursor = Some(index);
        if value.is_some_and(|c| !c.is_whitespace()) {
            if let Some(next) = self.next_editable(index) {
                self.cursor = Some(next);
            }
        }
        true
    }

    pub fn key(&mut self, index: usize, key: NavigationKey) {
        if index >= self.slots.len() {
            return;
        }
        let target = match (key, self.direction) {
            (NavigationKey::ArrowRight, TextDirection::LeftToRight)
            | (NavigationKey::ArrowLeft, TextDirection::RightToLeft) => self.next_editable(index),
            (NavigationKey::ArrowLeft, TextDirection::LeftToRight)
            | (NavigationKey::ArrowRight, TextDirection::RightToLeft) => {
                self.previous_editable(index)
            }
            (NavigationKey::Backspace, _) if self.slots[index].is_none() || !self.is_editable(index) => {
                self.previous_editable(index)
            }
            (NavigationKey::Backspace, _) => {
                self.slots[index] = None;
                Some(index)
            }
        };
        if let Some(target) = target {
            self.cursor = Some(target);
        }
    }

    fn next_editable(&self, index: usize) -> Option<usize> {
        (index + 1..self.slots.len()).find(|i| self.editable[*i])
    }

    fn previous_editable(&self, index: usize) -> Option<usize> {
        (0..index).rev().find(|i| self.editable[*i])
    }
}
