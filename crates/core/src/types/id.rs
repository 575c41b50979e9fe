//! Site identifier type.
//!
//! Sites are referenced by short opaque string IDs (e.g. `"2"`). An empty
//! string means "no site chosen" at the form boundary, so it is rejected
//! here and represented as `Option::None` by callers instead.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`SiteId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SiteIdError {
    /// The input string is empty or only whitespace.
    #[error("site id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("site id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A unique site identifier.
///
/// ## Examples
///
/// ```
/// use bgr_core::SiteId;
///
/// assert!(SiteId::parse("2").is_ok());
/// assert!(SiteId::parse("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteId(String);

impl SiteId {
    /// Maximum length of a site ID.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `SiteId` from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than
    /// [`Self::MAX_LENGTH`].
    pub fn parse(s: &str) -> Result<Self, SiteIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SiteIdError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SiteIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Parse optional form input, mapping blank input to `None`.
    ///
    /// The site dropdown posts `""` for its "Select a site..." option.
    #[must_use]
    pub fn from_form(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| Self::parse(v).ok())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SiteId {
    type Err = SiteIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SiteId {
    type Error = SiteIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SiteId> for String {
    fn from(id: SiteId) -> Self {
        id.0
    }
}

impl AsRef<str> for SiteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
