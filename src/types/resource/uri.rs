//! URI helpers and utilities

use std::fmt::{self, Display, Formatter};
use std::ops::Deref;
use serde::{Serialize, Deserialize};

/// Represents a resource URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uri(String);

impl Deref for Uri {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Display for Uri {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<String> for Uri {
    #[inline]
    fn from(s: String) -> Self {
        Uri(s)
    }
}

impl From<&str> for Uri {
    #[inline]
    fn from(s: &str) -> Self {
        Uri(s.to_owned())
    }
}

impl Uri {
    /// Returns the URI as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwraps the inner [`String`]
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}
