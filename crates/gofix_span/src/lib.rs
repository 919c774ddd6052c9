//! Byte spans and source positions shared by every gofix crate.

use core::fmt;
use core::ops::Range;

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)` into a single source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted span {start}..{end}");
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// A zero-width span at `offset`.
    #[inline]
    pub fn point(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        (self.start as usize) <= offset && offset < self.end as usize
    }

    /// Reports whether `other` lies entirely within `self`.
    #[inline]
    pub fn encloses(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Moves the span by `delta` bytes; used when text is re-parsed in isolation.
    pub fn shifted(self, delta: i64) -> Span {
        let start = (i64::from(self.start) + delta).max(0) as u32;
        let end = (i64::from(self.end) + delta).max(0) as u32;
        Span { start, end }
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Returns the text covered by this span.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.range()).unwrap_or_default()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Range<usize>> for Span {
    fn from(value: Range<usize>) -> Self {
        Span::new(value.start, value.end)
    }
}

/// Index of a source file within a `Program`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// An absolute position: a byte offset within a particular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub file: FileId,
    pub offset: u32,
}

impl Pos {
    #[inline]
    pub fn new(file: FileId, offset: u32) -> Self {
        Self { file, offset }
    }
}

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx as u32 + 1);
            }
        }
        Self {
            line_starts,
            len: text.len() as u32,
        }
    }

    /// Returns the (line, column) of `offset`, both 1-based; columns count bytes.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = (offset as u32).min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let col = offset - self.line_starts[line];
        (line + 1, col as usize + 1)
    }

    /// Returns the byte offset of a 1-based (line, column) pair, if it exists.
    pub fn offset(&self, line: usize, col: usize) -> Option<usize> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map_or(self.len, |next| next.saturating_sub(1));
        let offset = start + u32::try_from(col.checked_sub(1)?).ok()?;
        (offset <= end).then_some(offset as usize)
    }

    /// Returns the byte offset where the line containing `offset` begins.
    pub fn line_start(&self, offset: usize) -> usize {
        let (line, _) = self.line_col(offset);
        self.line_starts[line - 1] as usize
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_cover_and_contains() {
        let a = Span::new(3, 7);
        let b = Span::new(5, 12);
        assert_eq!(a.cover(b), Span::new(3, 12));
        assert!(a.contains(3));
        assert!(!a.contains(7));
        assert!(Span::new(0, 20).encloses(b));
        assert_eq!(a.slice("0123456789"), "3456");
    }

    #[test]
    fn test_line_index_roundtrip() {
        let text = "package p\n\nfunc f() {}\n";
        let index = LineIndex::new(text);
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(11), (3, 1));
        assert_eq!(index.offset(3, 6), Some(16));
        assert_eq!(index.line_start(16), 11);
        assert_eq!(index.offset(9, 1), None);
    }
}
