use gofix_ast::{CommentGroup, Decl, File};
use gofix_lexer::Comment;
use gofix_span::LineIndex;

struct Group {
    group: CommentGroup,
    last_line: usize,
    /// The first comment is the first thing on its line.
    leading: bool,
}

/// Groups comments and attaches doc comments to the file, its declarations
/// and the specs of parenthesized declarations.
///
/// A doc comment is a group that starts its own line and ends on the line
/// directly above the documented item.
pub(crate) fn attach(file: &mut File, source: &str, comments: &[Comment]) {
    let index = LineIndex::new(source);
    let groups = group_comments(source, &index, comments);
    let line_of = |offset: u32| index.line_col(offset as usize).0;

    file.doc = doc_for(&groups, line_of(file.package.span().start));
    for decl in &mut file.decls {
        let line = line_of(decl.span().start);
        let doc = doc_for(&groups, line);
        match decl.as_mut() {
            Decl::Func(func) => func.doc = doc,
            Decl::Gen(gen_decl) => {
                gen_decl.doc = doc;
                if gen_decl.lparen.is_some() {
                    for spec in &mut gen_decl.specs {
                        let line = line_of(spec.span().start);
                        *spec.as_mut().doc_mut() = doc_for(&groups, line);
                    }
                }
            }
        }
    }
    file.comments = groups.into_iter().map(|group| group.group).collect();
}

fn group_comments(source: &str, index: &LineIndex, comments: &[Comment]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for comment in comments {
        let start = comment.span.start as usize;
        let end = (comment.span.end as usize).max(start + 1) - 1;
        let first_line = index.line_col(start).0;
        let last_line = index.line_col(end).0;
        if let Some(group) = groups.last_mut() {
            if first_line <= group.last_line + 1 {
                group.group.list.push(comment.clone());
                group.last_line = last_line;
                continue;
            }
        }
        let line_start = index.line_start(start);
        let leading = source
            .get(line_start..start)
            .is_some_and(|prefix| prefix.trim().is_empty());
        groups.push(Group {
            group: CommentGroup {
                list: vec![comment.clone()],
            },
            last_line,
            leading,
        });
    }
    groups
}

fn doc_for(groups: &[Group], line: usize) -> Option<CommentGroup> {
    groups
        .iter()
        .find(|group| group.leading && group.last_line + 1 == line)
        .map(|group| group.group.clone())
}
