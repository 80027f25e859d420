//! Domain newtypes providing compile-time safety and self-documentation.
//!
//! These wrappers prevent common bugs like passing a thread id where a
//! process id is expected, and make function signatures self-documenting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Pid {
    fn from(pid: i32) -> Self {
        Pid(pid)
    }
}

impl From<Pid> for i32 {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}

/// A thread id.
///
/// Distinct from [`Pid`] so a thread id can never be accidentally passed
/// to an API that expects a process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tid(pub i32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Tid {
    fn from(tid: i32) -> Self {
        Tid(tid)
    }
}

/// A caller-provided tag labeling a group of watched PIDs.
///
/// Construction is validated: a tag must be non-empty and not pure
/// whitespace. Use [`Tag::new`] at system boundaries; internal code that
/// already holds a validated `Tag` can clone it freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Validates and constructs a tag.
    ///
    /// # Errors
    /// Returns an error if `raw` is empty or consists entirely of whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidTag> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(InvalidTag);
        }
        Ok(Tag(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A tag failed validation (empty or whitespace-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tag must be non-empty and not whitespace-only")]
pub struct InvalidTag;
