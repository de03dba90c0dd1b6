//! Account login names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A login name for an account.
///
/// Login names are only ever produced by [`Username::sanitize`], which applies
/// the host platform's login rules. The result may be empty; an empty
/// username is never valid for account creation and callers treat it as
/// "no username could be derived".
///
/// ```
/// use autoreg_core::Username;
///
/// assert_eq!(Username::sanitize("jane.doe").as_str(), "jane.doe");
/// assert_eq!(Username::sanitize("José+shop").as_str(), "Joseshop");
/// assert_eq!(Username::sanitize("  two   words ").as_str(), "two words");
/// assert!(Username::sanitize("<b></b>").is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Apply login sanitization to arbitrary input.
    ///
    /// In order: `<script>`/`<style>` elements are removed with their
    /// content, remaining HTML tags are removed, accented Latin letters are folded to
    /// ASCII, percent-encoded octets and HTML entities are removed, every
    /// character outside `[A-Za-z0-9 _.\-@]` is dropped, and whitespace is
    /// trimmed and collapsed to single spaces.
    #[must_use]
    pub fn sanitize(raw: &str) -> Self {
        let untagged = strip_tags(&strip_script_blocks(raw));

        let mut folded = String::with_capacity(untagged.len());
        for c in untagged.chars() {
            fold_accent(c, &mut folded);
        }

        let without_entities = strip_entities(&strip_octets(&folded));

        let allowed: String = without_entities
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-' | '@'))
            .collect();

        Self(allowed.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Returns the login as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when sanitization left nothing usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive comparison; logins are unique regardless of case.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Remove `<script ...>...</script>` and `<style ...>...</style>` elements,
/// case-insensitively. An element without its closing tag is left for
/// [`strip_tags`].
fn strip_script_blocks(s: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `s`.
    let lower = s.to_ascii_lowercase();
    let mut out = String::with_capacity(s.len());
    let mut pos = 0;

    while let Some(offset) = lower.get(pos..).and_then(|rest| rest.find('<')) {
        let start = pos + offset;
        let after = lower.get(start + 1..).unwrap_or_default();
        let end = ["script", "style"]
            .into_iter()
            .find(|name| after.starts_with(name))
            .and_then(|name| {
                let open_end = start + 1 + after.find('>')? + 1;
                let close = format!("</{name}>");
                let close_at = lower.get(open_end..)?.find(&close)?;
                Some(open_end + close_at + close.len())
            });

        match end {
            Some(end) => {
                out.push_str(s.get(pos..start).unwrap_or_default());
                pos = end;
            }
            None => {
                out.push_str(s.get(pos..=start).unwrap_or_default());
                pos = start + 1;
            }
        }
    }
    out.push_str(s.get(pos..).unwrap_or_default());
    out
}

/// Remove `<...>` sequences. An unterminated `<` drops the rest of the input.
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Remove `%XX` hex octets.
fn strip_octets(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let is_octet = c == '%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        if is_octet {
            chars.next();
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Remove `&...;` entities (shortest match, at least one character inside).
fn strip_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        let (before, from_amp) = rest.split_at(start);
        out.push_str(before);
        let body = from_amp.strip_prefix('&').unwrap_or(from_amp);
        match body.char_indices().skip(1).find(|&(_, c)| c == ';') {
            Some((end, _)) => rest = body.get(end + 1..).unwrap_or_default(),
            None => {
                out.push('&');
                rest = body;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Fold common accented Latin letters to their ASCII base.
fn fold_accent(c: char, out: &mut String) {
    let folded = match c {
        'À'..='Å' => "A",
        'à'..='å' => "a",
        'Æ' => "AE",
        'æ' => "ae",
        'Ç' => "C",
        'ç' => "c",
        'È'..='Ë' => "E",
        'è'..='ë' => "e",
        'Ì'..='Ï' => "I",
        'ì'..='ï' => "i",
        'Ð' => "D",
        'ð' => "d",
        'Ñ' => "N",
        'ñ' => "n",
        'Ò'..='Ö' | 'Ø' => "O",
        'ò'..='ö' | 'ø' => "o",
        'Ù'..='Ü' => "U",
        'ù'..='ü' => "u",
        'Ý' => "Y",
        'ý' | 'ÿ' => "y",
        'Þ' => "TH",
        'þ' => "th",
        'ß' => "ss",
        _ => {
            out.push(c);
            return;
        }
    };
    out.push_str(folded);
}
