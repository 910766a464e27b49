//! Proximity-scoped boolean toggles.
//!
//! Arrays of sibling dictionaries (kexts, drivers, patches) repeat the same
//! key names in every entry, so a plain key rewrite cannot address one of
//! them. The toggle anchors on a marker string unique to one entry and only
//! touches the field belonging to that entry.

use crate::document::{PlistDocument, Rewrite, escape_text};
use crate::error::{EditError, EditResult};
use crate::scan;
use ocpatch_types::ops::ToggleScope;
use regex::Regex;
use std::ops::Range;
use tracing::debug;

fn bool_field_regex(field: &str) -> EditResult<Regex> {
    Ok(Regex::new(&format!(
        r"<key>{}</key>\s*(?P<tag><(?:true|false)/>)",
        regex::escape(field)
    ))?)
}

/// Set the boolean `field` of the entry identified by `marker`.
///
/// `marker` must be the complete content of a `<string>` element, e.g. a
/// kext's `BundlePath`. Only its first occurrence outside comments is used.
pub fn toggle_near(
    doc: &mut PlistDocument,
    marker: &str,
    field: &str,
    enabled: bool,
    scope: ToggleScope,
) -> EditResult<Rewrite> {
    let text = doc.as_str();
    let marker_el = format!("<string>{}</string>", escape_text(marker));
    let comments = scan::Comments::of(text);
    let marker_at = text
        .match_indices(&marker_el)
        .map(|(at, _)| at)
        .find(|at| !comments.contains(*at));
    let Some(marker_at) = marker_at else {
        return Err(EditError::not_found(format!("marker {marker_el}")));
    };
    let marker_end = marker_at + marker_el.len();

    let re = bool_field_regex(field)?;
    let tag = match scope {
        ToggleScope::Window(chars) => find_in_window(text, &re, &comments, marker_end, chars),
        ToggleScope::EnclosingDict => find_in_enclosing_dict(text, &re, &comments, marker_at)?,
    };
    let Some(tag) = tag else {
        return Err(EditError::not_found(format!(
            "<key>{field}</key> boolean near {marker_el} ({scope:?})"
        )));
    };

    let replacement = if enabled { "<true/>" } else { "<false/>" };
    let mut new = String::with_capacity(text.len() + 1);
    new.push_str(&text[..tag.start]);
    new.push_str(replacement);
    new.push_str(&text[tag.end..]);

    let changed = doc.replace_text(new);
    debug!(marker, field, enabled, changed, "toggled field");
    Ok(Rewrite {
        occurrences: 1,
        changed,
    })
}

fn find_in_window(
    text: &str,
    re: &Regex,
    comments: &scan::Comments,
    from: usize,
    chars: usize,
) -> Option<Range<usize>> {
    let end = text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| from + i);
    re.captures_iter(&text[from..end])
        .filter(|caps| caps.get(0).is_some_and(|m| !comments.contains(from + m.start())))
        .find_map(|caps| caps.name("tag"))
        .map(|m| from + m.start()..from + m.end())
}

fn find_in_enclosing_dict(
    text: &str,
    re: &Regex,
    comments: &scan::Comments,
    marker_at: usize,
) -> EditResult<Option<Range<usize>>> {
    let span = scan::enclosing_dict(text, marker_at).ok_or_else(|| EditError::Malformed {
        what: "marker is not inside a balanced <dict>".to_string(),
    })?;
    let inner = span.inner;

    let tag = re
        .captures_iter(&text[inner.clone()])
        .filter(|caps| {
            let at = inner.start + caps.get(0).map_or(0, |m| m.start());
            !comments.contains(at) && scan::dict_depth(text, inner.start, at) == 0
        })
        .find_map(|caps| caps.name("tag"))
        .map(|m| inner.start + m.start()..inner.start + m.end());
    Ok(tag)
}
