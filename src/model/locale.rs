//! Locale identifiers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A normalized locale tag such as `en`, `fr-CA` or `zh-Hant-TW`.
///
/// Underscores are accepted as separators; the language subtag is lowercased,
/// two-letter region subtags are uppercased and four-letter script subtags
/// are title-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleId(String);

impl LocaleId {
    /// Parse and normalize a locale tag.
    pub fn new(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(Error::Other("empty locale tag".to_string()));
        }

        let mut normalized = Vec::new();
        for (i, subtag) in tag.split(['-', '_']).enumerate() {
            if subtag.is_empty() || !subtag.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(Error::Other(format!("invalid locale tag: {}", tag)));
            }
            let subtag = if i == 0 {
                subtag.to_ascii_lowercase()
            } else if subtag.len() == 2 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
                subtag.to_ascii_uppercase()
            } else if subtag.len() == 4 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
                let lower = subtag.to_ascii_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => lower,
                }
            } else {
                subtag.to_ascii_lowercase()
            };
            normalized.push(subtag);
        }

        Ok(Self(normalized.join("-")))
    }

    /// The normalized tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The language subtag (e.g. `fr` for `fr-CA`).
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// The region subtag if present (e.g. `CA` for `fr-CA`).
    pub fn region(&self) -> Option<&str> {
        self.0
            .split('-')
            .skip(1)
            .find(|s| s.len() == 2 || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit())))
    }

    /// Check whether two locales share a language subtag.
    pub fn same_language_as(&self, other: &LocaleId) -> bool {
        self.language() == other.language()
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocaleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LocaleId::new(s)
    }
}

impl TryFrom<String> for LocaleId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        LocaleId::new(&value)
    }
}

impl TryFrom<&str> for LocaleId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        LocaleId::new(value)
    }
}

impl From<LocaleId> for String {
    fn from(locale: LocaleId) -> Self {
        locale.0
    }
}
