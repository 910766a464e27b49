//! `boot-args` token merging.

use crate::document::{PlistDocument, Rewrite, escape_text, unescape_text};
use crate::error::{EditError, EditResult};
use crate::rewrite::{count_values, get_raw_value, write_rendered};
use ocpatch_types::ops::{Cardinality, ValueType};
use tracing::debug;

/// Key holding the kernel command line in `NVRAM > Add`.
pub const BOOT_ARGS_KEY: &str = "boot-args";

/// Append each required token not already present.
///
/// Existing tokens keep their order; membership is by whole token, so
/// `-v` is not considered present in `-vx`. Runs of whitespace collapse to
/// one space and the result is trimmed.
pub fn merge_tokens<S: AsRef<str>>(existing: &str, required: &[S]) -> String {
    let mut tokens: Vec<&str> = existing.split_whitespace().collect();
    for token in required.iter().flat_map(|t| t.as_ref().split_whitespace()) {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens.join(" ")
}

/// Same merge over escaped `<string>` content.
///
/// Existing tokens are kept exactly as written, entity references included;
/// membership compares decoded text and appended tokens are escaped.
fn merge_raw_tokens<S: AsRef<str>>(raw: &str, required: &[S]) -> String {
    let mut tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    let mut present: Vec<String> = tokens
        .iter()
        .map(|t| unescape_text(t).into_owned())
        .collect();
    for token in required.iter().flat_map(|t| t.as_ref().split_whitespace()) {
        if !present.iter().any(|p| p == token) {
            present.push(token.to_string());
            tokens.push(escape_text(token).into_owned());
        }
    }
    tokens.join(" ")
}

/// Merge `required` into the document's `boot-args` string.
pub fn merge_boot_args<S: AsRef<str>>(
    doc: &mut PlistDocument,
    required: &[S],
) -> EditResult<Rewrite> {
    let count = count_values(doc, BOOT_ARGS_KEY, ValueType::String)?;
    if count > 1 {
        return Err(EditError::AmbiguousMatch {
            what: format!("<key>{BOOT_ARGS_KEY}</key>"),
            count,
        });
    }
    let Some(current) = get_raw_value(doc, BOOT_ARGS_KEY, ValueType::String)? else {
        return Err(EditError::not_found(format!(
            "<key>{BOOT_ARGS_KEY}</key> string"
        )));
    };

    let merged = merge_raw_tokens(&current, required);
    if merged == current {
        return Ok(Rewrite {
            occurrences: 1,
            changed: false,
        });
    }
    debug!(before = %current, after = %merged, "merged boot-args");
    write_rendered(
        doc,
        BOOT_ARGS_KEY,
        ValueType::String,
        &format!("<string>{merged}</string>"),
        Cardinality::ExactlyOne,
    )
}
