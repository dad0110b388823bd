//! Shared validated types for the dcm2bids workspace.
//!
//! - [`NonEmptyText`] guarantees trimmed, non-blank strings.
//! - [`Participant`] models one BIDS subject (and optional session) and derives the
//!   `sub-<label>[_ses-<label>]` prefix used to namespace converter output.

use std::path::PathBuf;

/// BIDS entity key prefix for subjects.
pub const SUBJECT_PREFIX: &str = "sub-";

/// BIDS entity key prefix for sessions.
pub const SESSION_PREFIX: &str = "ses-";

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A BIDS participant: a subject label plus an optional session label.
///
/// Labels are normalised on construction so that `01` and `sub-01` name the same subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    name: NonEmptyText,
    session: Option<NonEmptyText>,
}

impl Participant {
    /// Creates a participant from a subject label and an optional session label.
    ///
    /// The `sub-` / `ses-` entity prefixes are added when missing. A blank session is
    /// treated as no session.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if `name` is blank.
    pub fn new(name: impl AsRef<str>, session: Option<&str>) -> Result<Self, TextError> {
        let name = with_entity_prefix(NonEmptyText::new(name)?, SUBJECT_PREFIX);
        let session = session
            .and_then(|s| NonEmptyText::new(s).ok())
            .map(|s| with_entity_prefix(s, SESSION_PREFIX));

        Ok(Self { name, session })
    }

    /// Subject label including the `sub-` prefix.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Session label including the `ses-` prefix, if any.
    pub fn session(&self) -> Option<&str> {
        self.session.as_ref().map(NonEmptyText::as_str)
    }

    /// Filename prefix: `sub-<label>_ses-<label>` or `sub-<label>`.
    pub fn prefix(&self) -> String {
        match &self.session {
            Some(session) => format!("{}_{}", self.name, session),
            None => self.name.to_string(),
        }
    }

    /// Relative BIDS directory: `sub-<label>/ses-<label>` or `sub-<label>`.
    pub fn directory(&self) -> PathBuf {
        let mut dir = PathBuf::from(self.name.as_str());
        if let Some(session) = &self.session {
            dir.push(session.as_str());
        }
        dir
    }
}

fn with_entity_prefix(label: NonEmptyText, prefix: &str) -> NonEmptyText {
    if label.as_str().starts_with(prefix) {
        label
    } else {
        NonEmptyText(format!("{prefix}{label}"))
    }
}
