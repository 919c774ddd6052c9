//! Byte-range text edits.
//!
//! [`diff_edits`] turns an old and a new file content into a small set of
//! edits confined to the region that actually changed; [`apply_edits`]
//! applies a set of edits all-or-nothing.

mod apply;
mod compute;

pub use apply::{ApplyError, apply_edits};
pub use compute::diff_edits;

use serde::{Deserialize, Serialize};

/// Replacement of the bytes `start..end` of a file with `new_text`.
///
/// `expected` optionally holds the bytes the range is supposed to contain;
/// when present, applying the edit to content whose range differs fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl TextEdit {
    pub fn new(start: usize, end: usize, new_text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            new_text: new_text.into(),
            expected: None,
        }
    }

    pub fn insert(offset: usize, new_text: impl Into<String>) -> Self {
        Self::new(offset, offset, new_text)
    }

    #[must_use]
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn is_insert(&self) -> bool {
        self.start == self.end
    }

    /// Whether the two edits touch a common byte, or are insertions at the
    /// same offset.
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.start == other.start {
            return true;
        }
        self.start < other.end && other.start < self.end
    }
}
