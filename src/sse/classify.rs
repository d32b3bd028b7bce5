//! Pure prefix classification of physical SSE lines.

/// What a single physical line means to the frame assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Empty line: event boundary.
    Blank,
    /// Payload of a `data:` field (possibly empty, possibly a terminal token).
    Data(&'a [u8]),
    /// Payload of an `error:` field.
    Error(&'a [u8]),
    /// A bare JSON object carrying an `"error":` key, sent without any field
    /// prefix by some servers.
    RawJsonError(&'a [u8]),
    /// `event:`, `id:`, `retry:` or a `:` comment.
    Ignored,
    /// Anything else.
    Unknown,
}

pub const DONE_TOKEN: &[u8] = b"[DONE]";
pub const ALTERNATE_DONE_TOKEN: &[u8] = b"done";

pub(crate) const ERROR_MARKER: &[u8] = b"\"error\":";

const IGNORED_FIELDS: [&[u8]; 3] = [b"event", b"id", b"retry"];

/// Strip trailing `\r` and `\n` bytes.
pub fn trim_line_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = line {
        line = rest;
    }
    line
}

/// Classify one line. Matching is case-sensitive and happens after trailing
/// line terminators are trimmed.
pub fn classify(line: &[u8], raw_json_errors: bool) -> LineKind<'_> {
    let line = trim_line_end(line);
    if line.is_empty() {
        return LineKind::Blank;
    }
    if let Some(payload) = field_value(line, b"data") {
        return LineKind::Data(payload);
    }
    if let Some(payload) = field_value(line, b"error") {
        return LineKind::Error(payload);
    }
    if line[0] == b':' || IGNORED_FIELDS.iter().any(|f| field_value(line, f).is_some()) {
        return LineKind::Ignored;
    }
    if raw_json_errors && line[0] == b'{' && contains(line, ERROR_MARKER) {
        return LineKind::RawJsonError(line);
    }
    LineKind::Unknown
}

/// Whether a data payload ends the stream.
pub fn is_done_marker(payload: &[u8], alternate: bool) -> bool {
    payload == DONE_TOKEN || (alternate && payload == ALTERNATE_DONE_TOKEN)
}

/// `name:` followed by at most one space, as in the SSE field grammar.
fn field_value<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let value = line.strip_prefix(name)?.strip_prefix(b":")?;
    Some(value.strip_prefix(b" ").unwrap_or(value))
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}
