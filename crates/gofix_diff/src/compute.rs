use tracing::trace;

use crate::TextEdit;

/// Hunks whose old and new sizes multiply beyond this are replaced wholesale
/// instead of being diffed character by character.
const CHAR_DIFF_LIMIT: usize = 1 << 20;

/// Computes the edits turning `old` into `new`.
///
/// The common prefix and suffix are stripped first, so the diff only runs
/// over the changed region. That region is diffed by lines, and each changed
/// group of lines by characters. Edits are sorted by offset, never overlap,
/// and carry the original text they replace.
pub fn diff_edits(old: &str, new: &str) -> Vec<TextEdit> {
    if old == new {
        return Vec::new();
    }
    let prefix = common_prefix(old, new);
    let suffix = common_suffix(&old[prefix..], &new[prefix..]);
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    trace!(
        offset = prefix,
        old_len = old_mid.len(),
        new_len = new_mid.len(),
        "diffing changed region"
    );

    let old_lines: Vec<&str> = old_mid.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new_mid.split_inclusive('\n').collect();

    let mut builder = EditBuilder::new(old);
    let mut offset = prefix;
    let mut hunk_old = String::new();
    let mut hunk_new = String::new();
    let mut hunk_start = offset;
    for result in diff::slice(&old_lines, &new_lines) {
        match result {
            diff::Result::Left(line) => {
                if hunk_old.is_empty() && hunk_new.is_empty() {
                    hunk_start = offset;
                }
                hunk_old.push_str(line);
                offset += line.len();
            }
            diff::Result::Right(line) => {
                if hunk_old.is_empty() && hunk_new.is_empty() {
                    hunk_start = offset;
                }
                hunk_new.push_str(line);
            }
            diff::Result::Both(line, _) => {
                builder.hunk(hunk_start, &hunk_old, &hunk_new);
                hunk_old.clear();
                hunk_new.clear();
                offset += line.len();
            }
        }
    }
    builder.hunk(hunk_start, &hunk_old, &hunk_new);
    builder.finish()
}

struct EditBuilder<'a> {
    old: &'a str,
    edits: Vec<TextEdit>,
}

impl<'a> EditBuilder<'a> {
    fn new(old: &'a str) -> Self {
        Self {
            old,
            edits: Vec::new(),
        }
    }

    fn hunk(&mut self, start: usize, old: &str, new: &str) {
        if old.is_empty() && new.is_empty() {
            return;
        }
        if old.len().saturating_mul(new.len()) > CHAR_DIFF_LIMIT {
            self.push(start, start + old.len(), new);
            return;
        }

        let mut offset = start;
        let mut pending: Option<(usize, usize, String)> = None;
        for result in diff::chars(old, new) {
            match result {
                diff::Result::Left(c) => {
                    let (_, end, _) = pending.get_or_insert_with(|| (offset, offset, String::new()));
                    *end += c.len_utf8();
                    offset += c.len_utf8();
                }
                diff::Result::Right(c) => {
                    let (_, _, text) =
                        pending.get_or_insert_with(|| (offset, offset, String::new()));
                    text.push(c);
                }
                diff::Result::Both(c, _) => {
                    if let Some((s, e, text)) = pending.take() {
                        self.push(s, e, &text);
                    }
                    offset += c.len_utf8();
                }
            }
        }
        if let Some((s, e, text)) = pending.take() {
            self.push(s, e, &text);
        }
    }

    fn push(&mut self, start: usize, end: usize, new_text: &str) {
        let edit = TextEdit::new(start, end, new_text).with_expected(&self.old[start..end]);
        self.edits.push(edit);
    }

    fn finish(self) -> Vec<TextEdit> {
        self.edits
    }
}

fn common_prefix(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

fn common_suffix(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (x, y) in a.chars().rev().zip(b.chars().rev()) {
        if x != y {
            break;
        }
        len += x.len_utf8();
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply_edits;

    #[test]
    fn test_identical_content_has_no_edits() {
        assert!(diff_edits("same", "same").is_empty());
    }

    #[test]
    fn test_edits_are_confined_to_the_change() {
        let old = "package p\n\nfunc f() {\n\tx := Add(1, 2)\n}\n";
        let new = "package p\n\nfunc f() {\n\tx := 1 + 2\n}\n";
        let edits = diff_edits(old, new);
        assert!(!edits.is_empty());
        let first = edits.first().expect("edit");
        assert!(first.start >= old.find("Add").expect("call"));
        assert_eq!(apply_edits(old, &edits).expect("apply"), new);
    }

    #[test]
    fn test_separate_hunks_yield_separate_edits() {
        let old = "import \"a\"\n\nfunc f() {\n\tg()\n\th()\n\ti()\n}\n";
        let new = "import (\n\t\"a\"\n\t\"b\"\n)\n\nfunc f() {\n\tg()\n\th()\n\tb.I()\n}\n";
        let edits = diff_edits(old, new);
        assert!(edits.len() >= 2);
        assert!(edits.windows(2).all(|w| w[0].end <= w[1].start));
        assert_eq!(apply_edits(old, &edits).expect("apply"), new);
    }

    #[test]
    fn test_multibyte_text() {
        let old = "s := \"héllo\" // ünïcode\n";
        let new = "s := \"hällo wörld\" // ünïcode\n";
        let edits = diff_edits(old, new);
        for edit in &edits {
            assert!(old.is_char_boundary(edit.start));
            assert!(old.is_char_boundary(edit.end));
        }
        assert_eq!(apply_edits(old, &edits).expect("apply"), new);
    }

    #[test]
    fn test_pure_insertion_and_deletion() {
        let edits = diff_edits("ac", "abc");
        assert_eq!(edits, vec![TextEdit::new(1, 1, "b").with_expected("")]);
        let edits = diff_edits("abc", "ac");
        assert_eq!(edits, vec![TextEdit::new(1, 2, "").with_expected("b")]);
    }
}
