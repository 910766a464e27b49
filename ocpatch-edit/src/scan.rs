//! Tag-depth scanning over plist text.
//!
//! Just enough structure to find container boundaries: open, close, and
//! self-closing forms of one element name, with comments skipped.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Open,
    Close,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagEvent {
    pub kind: TagKind,
    pub span: Range<usize>,
}

/// A container element: `outer` covers the tags, `inner` only the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContainerSpan {
    pub outer: Range<usize>,
    pub inner: Range<usize>,
}

/// All `<name>`, `</name>` and `<name/>` tags inside `range`, in order.
pub(crate) fn tag_events(text: &str, name: &str, range: Range<usize>) -> Vec<TagEvent> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let empty = format!("<{name}/>");

    let mut events = Vec::new();
    let mut pos = range.start;
    while pos < range.end {
        let Some(rel) = text[pos..range.end].find('<') else {
            break;
        };
        let at = pos + rel;
        let rest = &text[at..range.end];

        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => {
                    pos = at + end + 3;
                    continue;
                }
                None => break,
            }
        }

        let hit = [
            (TagKind::Open, open.as_str()),
            (TagKind::Close, close.as_str()),
            (TagKind::Empty, empty.as_str()),
        ]
        .into_iter()
        .find(|(_, tag)| rest.starts_with(tag));

        match hit {
            Some((kind, tag)) => {
                events.push(TagEvent {
                    kind,
                    span: at..at + tag.len(),
                });
                pos = at + tag.len();
            }
            None => pos = at + 1,
        }
    }
    events
}

/// Find the close tag balancing an open tag that ends at `after_open`.
pub(crate) fn matching_close(text: &str, name: &str, after_open: usize) -> Option<Range<usize>> {
    let mut depth = 1usize;
    for ev in tag_events(text, name, after_open..text.len()) {
        match ev.kind {
            TagKind::Open => depth += 1,
            TagKind::Close => {
                depth -= 1;
                if depth == 0 {
                    return Some(ev.span);
                }
            }
            TagKind::Empty => {}
        }
    }
    None
}

/// The innermost `<dict>` whose content contains byte offset `pos`.
pub(crate) fn enclosing_dict(text: &str, pos: usize) -> Option<ContainerSpan> {
    let mut stack: Vec<Range<usize>> = Vec::new();
    let mut target: Option<(Range<usize>, usize)> = None;

    for ev in tag_events(text, "dict", 0..text.len()) {
        if target.is_none() && ev.span.start >= pos {
            let open = stack.last()?.clone();
            target = Some((open, stack.len()));
        }
        match ev.kind {
            TagKind::Open => stack.push(ev.span),
            TagKind::Close => {
                let open = stack.pop()?;
                if let Some((ref want, depth)) = target
                    && stack.len() + 1 == depth
                    && open == *want
                {
                    return Some(ContainerSpan {
                        outer: open.start..ev.span.end,
                        inner: open.end..ev.span.start,
                    });
                }
            }
            TagKind::Empty => {}
        }
    }
    None
}

/// Net `<dict>` nesting between `from` and `to`; zero means `to` sits at the
/// same level as `from`.
pub(crate) fn dict_depth(text: &str, from: usize, to: usize) -> isize {
    tag_events(text, "dict", from..to)
        .iter()
        .map(|ev| match ev.kind {
            TagKind::Open => 1,
            TagKind::Close => -1,
            TagKind::Empty => 0,
        })
        .sum()
}

/// Whether every `name` container in `text` is closed in order.
pub(crate) fn is_balanced(text: &str, name: &str) -> bool {
    let mut depth = 0isize;
    for ev in tag_events(text, name, 0..text.len()) {
        match ev.kind {
            TagKind::Open => depth += 1,
            TagKind::Close => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            TagKind::Empty => {}
        }
    }
    depth == 0
}

/// Leading whitespace of the line containing `pos`.
pub(crate) fn line_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..pos];
    let ws = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..ws]
}

/// Byte ranges of the `<!-- -->` comments in a text. An unterminated
/// comment runs to the end.
#[derive(Debug, Clone, Default)]
pub(crate) struct Comments(Vec<Range<usize>>);

impl Comments {
    pub(crate) fn of(text: &str) -> Self {
        let mut spans = Vec::new();
        let mut pos = 0;
        while let Some(rel) = text[pos..].find("<!--") {
            let start = pos + rel;
            let body = start + "<!--".len();
            let end = text[body..]
                .find("-->")
                .map_or(text.len(), |e| body + e + "-->".len());
            spans.push(start..end);
            pos = end;
        }
        Self(spans)
    }

    /// Whether byte `pos` lies inside a comment.
    pub(crate) fn contains(&self, pos: usize) -> bool {
        self.0.iter().any(|span| span.contains(&pos))
    }
}
