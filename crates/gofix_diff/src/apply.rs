use thiserror::Error;
use tracing::debug;

use crate::TextEdit;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("edit {start}..{end} is out of bounds (content length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("edit {start}..{end} does not fall on character boundaries")]
    NotCharBoundary { start: usize, end: usize },
    #[error("edits {first:?} and {second:?} overlap")]
    Overlap {
        first: (usize, usize),
        second: (usize, usize),
    },
    #[error("content at {start}..{end} has changed since the edit was computed")]
    Stale { start: usize, end: usize },
}

/// Applies `edits` to `content`.
///
/// The edits may be given in any order. Identical duplicates are applied
/// once, so several fixes that each insert the same import merge cleanly.
/// Every edit is validated before anything is written: on any failure the
/// whole set is rejected and no partial result is produced.
pub fn apply_edits(content: &str, edits: &[TextEdit]) -> Result<String, ApplyError> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|edit| (edit.start, edit.end));
    sorted.dedup_by(|b, a| a == b);

    let len = content.len();
    for edit in &sorted {
        let (start, end) = (edit.start, edit.end);
        if start > end || end > len {
            return Err(ApplyError::OutOfBounds { start, end, len });
        }
        if !content.is_char_boundary(start) || !content.is_char_boundary(end) {
            return Err(ApplyError::NotCharBoundary { start, end });
        }
        if let Some(expected) = &edit.expected
            && content[start..end] != *expected
        {
            return Err(ApplyError::Stale { start, end });
        }
    }
    for pair in sorted.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.overlaps(b) {
            return Err(ApplyError::Overlap {
                first: (a.start, a.end),
                second: (b.start, b.end),
            });
        }
    }

    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for edit in &sorted {
        out.push_str(&content[last..edit.start]);
        out.push_str(&edit.new_text);
        last = edit.end;
    }
    out.push_str(&content[last..]);
    debug!(edits = sorted.len(), "applied edits");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_any_order() {
        let edits = vec![TextEdit::new(4, 5, "X"), TextEdit::insert(0, ">")];
        assert_eq!(apply_edits("abcdef", &edits).expect("apply"), ">abcdXf");
    }

    #[test]
    fn test_identical_duplicates_apply_once() {
        let import = TextEdit::insert(10, "import \"q\"\n");
        let edits = vec![import.clone(), TextEdit::new(12, 13, "Z"), import];
        let content = "package p\nx := 1\n";
        let out = apply_edits(content, &edits).expect("apply");
        assert_eq!(out, "package p\nimport \"q\"\nx Z= 1\n");
    }

    #[test]
    fn test_overlap_rejects_everything() {
        let edits = vec![TextEdit::new(0, 3, "x"), TextEdit::new(2, 4, "y")];
        assert!(matches!(
            apply_edits("abcdef", &edits),
            Err(ApplyError::Overlap { .. })
        ));
        let inserts = vec![TextEdit::insert(1, "x"), TextEdit::insert(1, "y")];
        assert!(matches!(
            apply_edits("abc", &inserts),
            Err(ApplyError::Overlap { .. })
        ));
    }

    #[test]
    fn test_stale_content_is_detected() {
        let edit = TextEdit::new(0, 3, "new").with_expected("old");
        assert_eq!(
            apply_edits("abc", &[edit]),
            Err(ApplyError::Stale { start: 0, end: 3 })
        );
    }

    #[test]
    fn test_bounds_and_boundaries() {
        assert!(matches!(
            apply_edits("ab", &[TextEdit::new(1, 5, "")]),
            Err(ApplyError::OutOfBounds { .. })
        ));
        assert!(matches!(
            apply_edits("é", &[TextEdit::new(1, 2, "")]),
            Err(ApplyError::NotCharBoundary { .. })
        ));
    }
}
