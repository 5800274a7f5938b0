//! Correlation keys
//!
//! A [`CorrelationKey`] ties one remote list entry to the local items it was
//! matched with. Keys are unique per match entry within a pass, but several
//! leaves expanded from the same grouping share their entry's key.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered tuple of identifiers, e.g. `["imdb", "tt0944947"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationKey(Vec<String>);

impl CorrelationKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Parse a `/`-separated key such as `tvdb/121361`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidKey`] for an empty key or an empty part.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(SyncError::InvalidKey("key cannot be empty".to_string()));
        }

        let parts: Vec<String> = s.split('/').map(str::to_string).collect();
        if parts.iter().any(String::is_empty) {
            return Err(SyncError::InvalidKey(format!("empty part in '{}'", s)));
        }

        Ok(Self(parts))
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Key of a child inside a grouping, e.g. season `1` of a show.
    pub fn child(&self, sub_key: &SubKey) -> Self {
        let mut parts = self.0.clone();
        parts.push(sub_key.to_string());
        Self(parts)
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Key of a child value inside a grouping (season number, episode number...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubKey(String);

impl SubKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for SubKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<u32> for SubKey {
    fn from(number: u32) -> Self {
        Self(number.to_string())
    }
}
