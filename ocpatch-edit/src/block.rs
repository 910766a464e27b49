//! Whole-array replacement.

use crate::document::{PlistDocument, Rewrite};
use crate::error::{EditError, EditResult};
use crate::scan;
use regex::Regex;
use tracing::debug;

/// Replace the `<key>{key}</key><array>…</array>` pair with `block`.
///
/// The closing tag is found by depth, so nested arrays inside the target do
/// not end the match early. The first line of `block` replaces the key in
/// place; every following line is prefixed with the key's own indentation,
/// which lets callers render blocks at column zero. Lines are joined with
/// the line ending used at the key. A key inside a comment is not a match.
pub fn replace_array(doc: &mut PlistDocument, key: &str, block: &str) -> EditResult<Rewrite> {
    validate_block(key, block)?;

    let text = doc.as_str();
    let re = Regex::new(&format!(
        r"<key>{}</key>\s*<array(/?)>",
        regex::escape(key)
    ))?;

    let comments = scan::Comments::of(text);
    let found: Vec<_> = re
        .captures_iter(text)
        .filter(|caps| caps.get(0).is_some_and(|m| !comments.contains(m.start())))
        .collect();
    let caps = match found.as_slice() {
        [] => return Err(EditError::not_found(format!("<key>{key}</key> array"))),
        [caps] => caps,
        many => {
            return Err(EditError::AmbiguousMatch {
                what: format!("<key>{key}</key> array"),
                count: many.len(),
            });
        }
    };

    let Some(head) = caps.get(0) else {
        return Err(EditError::not_found(format!("<key>{key}</key> array")));
    };
    let self_closing = caps.get(1).is_some_and(|m| m.as_str() == "/");
    let end = if self_closing {
        head.end()
    } else {
        scan::matching_close(text, "array", head.end())
            .ok_or_else(|| EditError::Malformed {
                what: format!("unterminated <array> after <key>{key}</key>"),
            })?
            .end
    };

    let indent = scan::line_indent(text, head.start());
    let eol = line_ending(text, head.start());
    let rendered = indent_block(block.trim(), indent, eol);

    let mut new = String::with_capacity(text.len() + rendered.len());
    new.push_str(&text[..head.start()]);
    new.push_str(&rendered);
    new.push_str(&text[end..]);

    let changed = doc.replace_text(new);
    debug!(key, changed, "replaced array block");
    Ok(Rewrite {
        occurrences: 1,
        changed,
    })
}

/// `"\r\n"` when the line holding `pos` ends with CRLF, `"\n"` otherwise.
fn line_ending(text: &str, pos: usize) -> &'static str {
    match text[pos..].find('\n') {
        Some(nl) if text[..pos + nl].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

fn indent_block(block: &str, indent: &str, eol: &str) -> String {
    let mut out = String::with_capacity(block.len() + indent.len() * 16);
    for (i, line) in block.lines().enumerate() {
        if i > 0 {
            out.push_str(eol);
            if !line.is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(line);
    }
    out
}

fn validate_block(key: &str, block: &str) -> EditResult<()> {
    let invalid = |reason: &str| EditError::InvalidBlock {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let body = block.trim();
    let Some(rest) = body.strip_prefix(&format!("<key>{key}</key>")) else {
        return Err(invalid("block must start with the key element"));
    };
    let rest = rest.trim_start();
    if !(rest.starts_with("<array>") || rest.starts_with("<array/>")) {
        return Err(invalid("key must be followed by an <array>"));
    }
    if !rest.ends_with("</array>") && rest != "<array/>" {
        return Err(invalid("block must end with the array's closing tag"));
    }
    for name in ["array", "dict"] {
        if !scan::is_balanced(rest, name) {
            return Err(invalid(&format!("unbalanced <{name}>")));
        }
    }
    Ok(())
}
