use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between the set and the question id inside a ledger key.
pub const KEY_SEPARATOR: char = '|';

/// Id used when a persisted question carries no `id` field.
pub const MISSING_QUESTION_ID: &str = "0";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Error type for building identifiers from raw strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("set id cannot be empty")]
    EmptySetId,

    #[error("set id `{0}` contains the reserved `|` separator")]
    ReservedSeparator(String),

    #[error("question key `{0}` has no `|` separator")]
    MalformedKey(String),
}

//
// ─── SET ID ────────────────────────────────────────────────────────────────────
//

/// Name of the origin set a question was loaded from.
///
/// Set ids never contain `|`, which keeps [`QuestionKey`] injective.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SetId(String);

impl SetId {
    /// Creates a new `SetId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::EmptySetId` for blank names and
    /// `IdError::ReservedSeparator` when the name contains `|`.
    pub fn new(name: impl Into<String>) -> Result<Self, IdError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IdError::EmptySetId);
        }
        if name.contains(KEY_SEPARATOR) {
            return Err(IdError::ReservedSeparator(name));
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SetId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SetId> for String {
    fn from(value: SetId) -> Self {
        value.0
    }
}

//
// ─── QUESTION ID ───────────────────────────────────────────────────────────────
//

/// Set-local identifier of a question, compared as a string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(String);

impl QuestionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id assigned to questions persisted without one.
    ///
    /// Every such question in a set shares this id and therefore one ledger entry.
    #[must_use]
    pub fn missing() -> Self {
        Self(MISSING_QUESTION_ID.to_owned())
    }

    /// Resolves an optional persisted id, falling back to [`QuestionId::missing`].
    #[must_use]
    pub fn or_missing(id: Option<String>) -> Self {
        id.map_or_else(Self::missing, Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//
// ─── QUESTION KEY ──────────────────────────────────────────────────────────────
//

/// Stable join key between a question and its attempt record.
///
/// Built only from `(origin, local id)`; display order, shuffling and labels
/// never take part in it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionKey {
    set_id: SetId,
    question_id: QuestionId,
}

impl QuestionKey {
    #[must_use]
    pub fn new(set_id: SetId, question_id: QuestionId) -> Self {
        Self {
            set_id,
            question_id,
        }
    }

    #[must_use]
    pub fn set_id(&self) -> &SetId {
        &self.set_id
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }
}

/// Serialized ledger key for a question identity: `"<origin>|<id>"`.
#[must_use]
pub fn key_for(set_id: &SetId, question_id: &QuestionId) -> String {
    format!("{}{KEY_SEPARATOR}{}", set_id.as_str(), question_id.as_str())
}

// ─── Debug Implementations ─────────────────────────────────────────────────────

impl fmt::Debug for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SetId({:?})", self.0)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({:?})", self.0)
    }
}

impl fmt::Debug for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionKey({self})")
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&key_for(&self.set_id, &self.question_id))
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

impl FromStr for SetId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for QuestionKey {
    type Err = IdError;

    /// Splits at the first `|`; the remainder (which may itself contain `|`) is the question id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (set, id) = s
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| IdError::MalformedKey(s.to_owned()))?;
        Ok(Self::new(SetId::new(set)?, QuestionId::new(id)))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
