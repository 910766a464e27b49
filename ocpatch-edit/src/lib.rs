//! Rewrite engine for OpenCore `config.plist` documents.
//!
//! Responsibilities:
//! - Rewrite typed values by key without a parse/re-serialize round trip.
//! - Toggle one entry in an array of look-alike dictionaries.
//! - Replace whole arrays with a canonical block.
//! - Merge `boot-args` tokens.
//! - Render a unified diff preview and content hashes.
//!
//! Everything outside the targeted value elements is left byte-for-byte
//! intact, in particular base64 `<data>` payloads.

pub mod block;
pub mod boot_args;
pub mod document;
mod error;
pub mod rewrite;
mod scan;
pub mod toggle;

pub use block::replace_array;
pub use boot_args::{BOOT_ARGS_KEY, merge_boot_args, merge_tokens};
pub use document::{PlistDocument, Rewrite, escape_text, unescape_text};
pub use error::{EditError, EditResult};
pub use rewrite::{count_key, count_values, get_value, set_value};
pub use toggle::toggle_near;

use diffy::PatchFormatter;
use ocpatch_types::ops::PatchOp;
use sha2::{Digest, Sha256};

/// Apply one operation to the document.
pub fn apply_op(doc: &mut PlistDocument, op: &PatchOp) -> EditResult<Rewrite> {
    match op {
        PatchOp::SetValue {
            key,
            value,
            cardinality,
        } => set_value(doc, key, value, *cardinality),
        PatchOp::ToggleNear {
            marker,
            field,
            enabled,
            scope,
        } => toggle_near(doc, marker, field, *enabled, *scope),
        PatchOp::ReplaceArray { key, block } => replace_array(doc, key, block),
        PatchOp::MergeBootArgs { tokens } => merge_boot_args(doc, tokens.as_slice()),
    }
}

/// Apply an operation to a string, returning the new content.
pub fn apply_op_to_content(contents: &str, op: &PatchOp) -> EditResult<String> {
    let mut doc = PlistDocument::new(contents);
    apply_op(&mut doc, op)?;
    Ok(doc.into_string())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Unified diff between two versions of `path`. Empty when identical.
pub fn render_patch(path: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    let body = PatchFormatter::new().fmt_patch(&patch).to_string();
    // diffy repeats its own "--- original/+++ modified" header; keep ours.
    let hunks = body
        .split_once("\n@@")
        .map(|(_, rest)| format!("@@{rest}"))
        .unwrap_or(body);
    out.push_str(&hunks);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
