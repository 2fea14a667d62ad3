use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on options per question; labels run from `A` to `E`.
pub const MAX_OPTIONS: usize = 5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("invalid answer label `{0}` (expected A-E)")]
    InvalidLabel(String),

    #[error("option index {0} has no label (max {MAX_OPTIONS} options)")]
    IndexOutOfRange(usize),

    #[error("option order is not a permutation of 0..{len}")]
    InvalidPermutation { len: usize },
}

//
// ─── ANSWER LABEL ──────────────────────────────────────────────────────────────
//

/// Positional option label (`A` = first option).
///
/// Labels are derived from position, never stored next to option text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnswerLabel(u8);

impl AnswerLabel {
    /// Label for the option at `index`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::IndexOutOfRange` when `index >= MAX_OPTIONS`.
    pub fn from_index(index: usize) -> Result<Self, AnswerError> {
        if index >= MAX_OPTIONS {
            return Err(AnswerError::IndexOutOfRange(index));
        }
        u8::try_from(index)
            .map(Self)
            .map_err(|_| AnswerError::IndexOutOfRange(index))
    }

    /// Parses a single letter, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidLabel` for anything outside `A..=E`.
    pub fn from_char(c: char) -> Result<Self, AnswerError> {
        let upper = c.to_ascii_uppercase();
        if !('A'..='E').contains(&upper) {
            return Err(AnswerError::InvalidLabel(c.to_string()));
        }
        Ok(Self(upper as u8 - b'A'))
    }

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    #[must_use]
    pub fn as_char(self) -> char {
        char::from(b'A' + self.0)
    }
}

impl fmt::Debug for AnswerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnswerLabel({})", self.as_char())
    }
}

impl fmt::Display for AnswerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for AnswerLabel {
    type Err = AnswerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Err(AnswerError::InvalidLabel(s.to_owned())),
        }
    }
}

impl TryFrom<String> for AnswerLabel {
    type Error = AnswerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnswerLabel> for String {
    fn from(value: AnswerLabel) -> Self {
        value.as_char().to_string()
    }
}

//
// ─── ANSWER SET ────────────────────────────────────────────────────────────────
//

/// Order-independent set of labels, used both for correct answers and user selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeSet<AnswerLabel>);

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses labels from free text such as `"B,D"`, `"bd"` or `"B D"`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidLabel` on the first character that is neither
    /// a label nor a separator.
    pub fn parse_letters(input: &str) -> Result<Self, AnswerError> {
        input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',' && *c != ';')
            .map(AnswerLabel::from_char)
            .collect()
    }

    pub fn insert(&mut self, label: AnswerLabel) -> bool {
        self.0.insert(label)
    }

    #[must_use]
    pub fn contains(&self, label: AnswerLabel) -> bool {
        self.0.contains(&label)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = AnswerLabel> + '_ {
        self.0.iter().copied()
    }

    /// Highest label in the set, if any.
    #[must_use]
    pub fn max_label(&self) -> Option<AnswerLabel> {
        self.0.last().copied()
    }
}

impl FromIterator<AnswerLabel> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = AnswerLabel>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for AnswerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&joined.join(", "))
    }
}

//
// ─── OPTION ORDER ──────────────────────────────────────────────────────────────
//

/// Display permutation for one question's options.
///
/// `order[displayed] = original`: the option shown at position `displayed`
/// is the stored option at index `original`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionOrder(Vec<usize>);

impl OptionOrder {
    /// Options shown in stored order.
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self((0..len).collect())
    }

    /// Wraps a permutation supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidPermutation` unless `order` contains each of
    /// `0..order.len()` exactly once.
    pub fn from_permutation(order: Vec<usize>) -> Result<Self, AnswerError> {
        let len = order.len();
        let mut seen = vec![false; len];
        for &original in &order {
            match seen.get_mut(original) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(AnswerError::InvalidPermutation { len }),
            }
        }
        Ok(Self(order))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &o)| i == o)
    }

    /// Stored index of the option shown at `displayed`.
    #[must_use]
    pub fn original_index(&self, displayed: usize) -> Option<usize> {
        self.0.get(displayed).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Translates a set expressed in stored label space into displayed label space.
    ///
    /// Labels pointing past the permutation are dropped.
    #[must_use]
    pub fn to_displayed(&self, stored: &AnswerSet) -> AnswerSet {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &original)| {
                AnswerLabel::from_index(original).is_ok_and(|label| stored.contains(label))
            })
            .filter_map(|(displayed, _)| AnswerLabel::from_index(displayed).ok())
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn set(letters: &str) -> AnswerSet {
        AnswerSet::parse_letters(letters).unwrap()
    }

    #[test]
    fn labels_follow_position() {
        assert_eq!(AnswerLabel::from_index(0).unwrap().as_char(), 'A');
        assert_eq!(AnswerLabel::from_index(4).unwrap().as_char(), 'E');
        assert!(AnswerLabel::from_index(5).is_err());
        assert_eq!(AnswerLabel::from_char('c').unwrap().index(), 2);
        assert!(AnswerLabel::from_char('F').is_err());
    }

    #[test]
    fn answer_sets_compare_without_order() {
        assert_eq!(set("D,B"), set("bd"));
        assert_ne!(set("B"), set("B D"));
    }

    #[test]
    fn parse_letters_rejects_garbage() {
        assert!(AnswerSet::parse_letters("A?").is_err());
        assert!(AnswerSet::parse_letters("").unwrap().is_empty());
    }

    #[test]
    fn answer_set_displays_sorted_letters() {
        assert_eq!(set("CA").to_string(), "A, C");
    }

    #[test]
    fn permutation_must_cover_every_index_once() {
        assert!(OptionOrder::from_permutation(vec![2, 0, 1]).is_ok());
        assert!(OptionOrder::from_permutation(vec![0, 0, 1]).is_err());
        assert!(OptionOrder::from_permutation(vec![0, 3]).is_err());
    }

    #[test]
    fn correct_answers_move_with_their_options() {
        // displayed A <- stored C, displayed B <- stored A, displayed C <- stored B
        let order = OptionOrder::from_permutation(vec![2, 0, 1]).unwrap();
        assert_eq!(order.to_displayed(&set("A")), set("B"));
        assert_eq!(order.to_displayed(&set("AC")), set("AB"));
        assert_eq!(OptionOrder::identity(3).to_displayed(&set("AC")), set("AC"));
    }
}
