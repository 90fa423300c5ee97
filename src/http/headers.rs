//! Header field storage and line-level header parsing.
//!
//! A [`HeaderStore`] keeps header names lower-cased, in insertion order.
//! Setting a name that is already present overwrites its value; there is no
//! multi-value support, so callers that need several values for one field
//! (a `Trailer` announcement naming two fields, for example) must join them
//! into one value themselves.

use thiserror::Error;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Characters other than letters and digits allowed in a field name.
const TOKEN_SPECIALS: &[u8] = b"!#$%&'*+-.^_`|~";

/// Errors raised while parsing a single header line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("malformed header line, missing \":\" separator")]
    MissingColon,

    #[error("invalid characters in header field-name")]
    InvalidFieldName,

    #[error("incorrect header name format, trailing whitespace before the \":\" separator")]
    TrailingWhitespace,

    #[error("header field-value is not valid UTF-8")]
    InvalidFieldValue,
}

/// Ordered mapping from lower-cased header name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    entries: Vec<(String, String)>,
}

impl HeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses at most one header line from the front of `data`.
    ///
    /// Returns the number of bytes consumed and whether the header section
    /// is finished. `(0, false)` means no complete line is available yet and
    /// the caller should come back with more bytes.
    pub fn parse_one(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let Some(idx) = find_crlf(data) else {
            return Ok((0, false));
        };
        if idx == 0 {
            return Ok((CRLF.len(), true));
        }

        let (name, value) = split_field(&data[..idx])?;
        self.set(&name, &value);

        Ok((idx + CRLF.len(), false))
    }

    /// Looks a header up, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `name` to `value`, replacing any previous value for that name.
    pub fn set(&mut self, name: &str, value: &str) {
        let key = name.trim().to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key, value.to_string())),
        }
    }

    /// Removes a header, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let key = name.to_ascii_lowercase();
        let pos = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}

/// Splits `name: value` into a lower-cased name and a trimmed value.
fn split_field(line: &[u8]) -> Result<(String, String), HeaderError> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(HeaderError::MissingColon)?;
    let (raw_name, raw_value) = (&line[..colon], &line[colon + 1..]);

    if !raw_name.iter().all(|&b| b == b' ' || is_token_char(b)) {
        return Err(HeaderError::InvalidFieldName);
    }
    if raw_name.last() == Some(&b' ') {
        return Err(HeaderError::TrailingWhitespace);
    }

    let name = trim_spaces(raw_name);
    if name.is_empty() || name.contains(&b' ') {
        return Err(HeaderError::InvalidFieldName);
    }

    // Field names are pure ASCII at this point.
    let name = String::from_utf8_lossy(name).to_ascii_lowercase();
    let value = std::str::from_utf8(trim_spaces(raw_value))
        .map_err(|_| HeaderError::InvalidFieldValue)?
        .to_string();
    Ok((name, value))
}

pub(crate) fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || TOKEN_SPECIALS.contains(&b)
}

fn trim_spaces(mut bytes: &[u8]) -> &[u8] {
    while let [b' ', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' '] = bytes {
        bytes = rest;
    }
    bytes
}

/// Canonical wire spelling of a lower-cased name: `content-type` becomes
/// `Content-Type`.
pub(crate) fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if upper_next {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        upper_next = c == '-';
    }
    out
}
