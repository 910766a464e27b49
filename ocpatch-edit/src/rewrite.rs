//! Key-value rewriting: `<key>Name</key>` followed by a typed value element.

use crate::document::{PlistDocument, Rewrite, escape_text, unescape_text};
use crate::error::{EditError, EditResult};
use crate::scan;
use ocpatch_types::ops::{Cardinality, PlistValue, ValueType};
use regex::{Captures, Regex};
use tracing::debug;

fn key_element(key: &str) -> String {
    format!("<key>{key}</key>")
}

/// Pattern for a key followed by a value of type `ty`.
///
/// Group 1 is the whitespace between the key and the value, group 2 the
/// raw value content (absent for the self-closing forms).
fn value_regex(key: &str, ty: ValueType) -> EditResult<Regex> {
    let k = regex::escape(key);
    let pattern = match ty {
        ValueType::String => {
            format!(r"<key>{k}</key>(\s*)(?:<string>([^<]*)</string>|<string/>)")
        }
        ValueType::Integer => {
            format!(r"<key>{k}</key>(\s*)(?:<integer>([^<]*)</integer>|<integer/>)")
        }
        ValueType::Bool => format!(r"<key>{k}</key>(\s*)<(true|false)/>"),
    };
    Ok(Regex::new(&pattern)?)
}

pub(crate) fn render_value(value: &PlistValue) -> String {
    match value {
        PlistValue::String(s) => format!("<string>{}</string>", escape_text(s)),
        PlistValue::Integer(i) => format!("<integer>{i}</integer>"),
        PlistValue::Bool(true) => "<true/>".to_string(),
        PlistValue::Bool(false) => "<false/>".to_string(),
    }
}

/// Matches of `re` that do not start inside an XML comment.
fn live_captures<'t>(re: &Regex, text: &'t str) -> Vec<Captures<'t>> {
    let comments = scan::Comments::of(text);
    re.captures_iter(text)
        .filter(|caps| caps.get(0).is_some_and(|m| !comments.contains(m.start())))
        .collect()
}

/// Number of `<key>` elements named `key`, regardless of their value type.
pub fn count_key(doc: &PlistDocument, key: &str) -> usize {
    let text = doc.as_str();
    let comments = scan::Comments::of(text);
    text.match_indices(&key_element(key))
        .filter(|(at, _)| !comments.contains(*at))
        .count()
}

/// Number of `key` entries whose value has type `ty`.
pub fn count_values(doc: &PlistDocument, key: &str, ty: ValueType) -> EditResult<usize> {
    Ok(live_captures(&value_regex(key, ty)?, doc.as_str()).len())
}

fn missing(doc: &PlistDocument, key: &str, ty: ValueType) -> EditError {
    if count_key(doc, key) > 0 {
        EditError::not_found(format!(
            "{} is present but has no <{}> value",
            key_element(key),
            ty.as_str()
        ))
    } else {
        EditError::not_found(key_element(key))
    }
}

/// Rewrite the value of every `key` entry of the value's type.
///
/// Only the value element changes; the key and the whitespace between key
/// and value are kept byte-for-byte. With [`Cardinality::ExactlyOne`] a
/// duplicated key is rejected before anything is written. Entries inside
/// comments are neither counted nor rewritten.
pub fn set_value(
    doc: &mut PlistDocument,
    key: &str,
    value: &PlistValue,
    cardinality: Cardinality,
) -> EditResult<Rewrite> {
    let rendered = render_value(value);
    let rw = write_rendered(doc, key, value.value_type(), &rendered, cardinality)?;
    debug!(
        key,
        occurrences = rw.occurrences,
        changed = rw.changed,
        value = %value,
        "set value"
    );
    Ok(rw)
}

/// Splice an already rendered value element after every live `key` entry
/// of type `ty`.
pub(crate) fn write_rendered(
    doc: &mut PlistDocument,
    key: &str,
    ty: ValueType,
    rendered: &str,
    cardinality: Cardinality,
) -> EditResult<Rewrite> {
    let re = value_regex(key, ty)?;
    let (occurrences, new) = {
        let text = doc.as_str();
        let found = live_captures(&re, text);
        if found.is_empty() {
            return Err(missing(doc, key, ty));
        }
        if cardinality == Cardinality::ExactlyOne && found.len() > 1 {
            return Err(EditError::AmbiguousMatch {
                what: key_element(key),
                count: found.len(),
            });
        }

        let key_el = key_element(key);
        let mut new = String::with_capacity(text.len() + rendered.len());
        let mut last = 0;
        for caps in &found {
            let (Some(whole), Some(ws)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            new.push_str(&text[last..whole.start()]);
            new.push_str(&key_el);
            new.push_str(ws.as_str());
            new.push_str(rendered);
            last = whole.end();
        }
        new.push_str(&text[last..]);
        (found.len(), new)
    };

    let changed = doc.replace_text(new);
    Ok(Rewrite {
        occurrences,
        changed,
    })
}

/// Raw content of the first live `key` entry of type `ty`, still escaped.
pub(crate) fn get_raw_value(
    doc: &PlistDocument,
    key: &str,
    ty: ValueType,
) -> EditResult<Option<String>> {
    let re = value_regex(key, ty)?;
    let found = live_captures(&re, doc.as_str());
    Ok(found
        .first()
        .map(|caps| caps.get(2).map_or("", |m| m.as_str()).to_string()))
}

/// Read the first `key` entry of type `ty`.
///
/// Strings are returned unescaped; booleans as `"true"`/`"false"`;
/// integers trimmed.
pub fn get_value(doc: &PlistDocument, key: &str, ty: ValueType) -> EditResult<Option<String>> {
    let Some(raw) = get_raw_value(doc, key, ty)? else {
        return Ok(None);
    };
    let value = match ty {
        ValueType::String => unescape_text(&raw).into_owned(),
        ValueType::Integer => raw.trim().to_string(),
        ValueType::Bool => raw,
    };
    Ok(Some(value))
}
