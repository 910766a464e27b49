//! In-memory plist text buffer.

use std::borrow::Cow;
use std::fmt;

/// An XML property list held as text.
///
/// Rules mutate the buffer in place and re-scan by content on every call,
/// so no offsets are cached between rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlistDocument {
    text: String,
}

impl PlistDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Swap in new text, returning whether anything changed.
    pub(crate) fn replace_text(&mut self, text: String) -> bool {
        if text == self.text {
            return false;
        }
        self.text = text;
        true
    }
}

impl From<String> for PlistDocument {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for PlistDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl AsRef<str> for PlistDocument {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for PlistDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Outcome of a successful rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewrite {
    /// Number of value elements the rule matched.
    pub occurrences: usize,
    /// Whether the document bytes changed.
    pub changed: bool,
}

/// Escape character data for a `<string>` element.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Decode the predefined XML entities and numeric character references in
/// `<string>` content. Unknown or malformed references are kept as written.
pub fn unescape_text(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .and_then(|semi| Some((decode_reference(&rest[1..semi])?, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
