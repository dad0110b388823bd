//! Lenient version strings.
//!
//! Converter releases are tagged like `v1.0.20181125`, which is not semver. [`LooseVersion`]
//! splits a tag into numeric and text segments and compares them element-wise:
//!
//! - digit runs compare numerically (`1.0.2 < 1.0.10`)
//! - text runs compare byte-wise and order below any number (`1.0rc1 < 1.0`)
//! - the shorter sequence is padded with zeros (`1.0 == 1.0.0`)

use crate::{ConverterError, ConverterResult};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// One component of a [`LooseVersion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Num(u64),
    Text(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Num(a), Segment::Num(b)) => a.cmp(b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Text(_), Segment::Num(_)) => Ordering::Less,
            (Segment::Num(_), Segment::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A parsed version string that keeps its original spelling for display.
#[derive(Debug, Clone)]
pub struct LooseVersion {
    raw: String,
    segments: Vec<Segment>,
}

impl LooseVersion {
    /// Parses a version string into segments.
    ///
    /// # Errors
    ///
    /// Returns `ConverterError::InvalidVersion` if the string has no segments at all
    /// (empty, whitespace or dots only) or a numeric run does not fit in a `u64`.
    pub fn parse(input: &str) -> ConverterResult<Self> {
        let raw = input.trim();
        let mut segments = Vec::new();
        let mut chars = raw.chars().peekable();

        while let Some(&c) = chars.peek() {
            if c == '.' {
                chars.next();
            } else if c.is_ascii_digit() {
                let mut digits = String::new();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse()
                    .map_err(|_| ConverterError::InvalidVersion(raw.to_string()))?;
                segments.push(Segment::Num(n));
            } else {
                let mut text = String::new();
                while let Some(&t) = chars.peek().filter(|t| **t != '.' && !t.is_ascii_digit()) {
                    text.push(t);
                    chars.next();
                }
                segments.push(Segment::Text(text));
            }
        }

        if segments.is_empty() {
            return Err(ConverterError::InvalidVersion(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for LooseVersion {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let zero = Segment::Num(0);
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).unwrap_or(&zero);
            let b = other.segments.get(i).unwrap_or(&zero);
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Equality follows ordering so that `1.0 == 1.0.0`.
impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LooseVersion {}

/// Extracts the version token from the banner dcm2niix prints when run without arguments.
///
/// The first line looks like `Chris Rorden's dcm2niiX version v1.0.20181125  GCC6.3.0 (64-bit
/// Linux)`; the token following the literal `version` is returned.
///
/// # Errors
///
/// Returns `ConverterError::VersionParse` when the first line has no `version` token or
/// nothing follows it.
pub fn parse_version_output(output: &str) -> ConverterResult<String> {
    let first_line = output.lines().next().unwrap_or_default();
    let mut tokens = first_line.split_whitespace();

    tokens
        .position(|t| t == "version")
        .and_then(|_| tokens.next())
        .map(str::to_string)
        .ok_or_else(|| ConverterError::VersionParse(first_line.to_string()))
}
