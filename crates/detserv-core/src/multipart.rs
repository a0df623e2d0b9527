//! Single-field `multipart/form-data` scanner (panic-free, zero-copy).
//!
//! Parsing rules:
//! - Never index past a checked bound; every range is computed from `find`
//!   results and validated before slicing.
//! - The returned payload is a `Bytes::slice` of the request body, no copy.
//! - A part is accepted only when its `Content-Disposition` parameter list is
//!   exactly `form-data; name="<field>"; filename="<field>"`, in that order.

use bytes::Bytes;

use crate::error::{DetectError, Result};

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const DISPOSITION_LINE: &[u8] = b"\r\nContent-Disposition:";
const CLOSING: &[u8] = b"--\r\n";

/// Default form field name carrying the image.
pub const DEFAULT_FIELD_NAME: &str = "image";

/// Extracts the payload of one named field from a raw multipart body.
#[derive(Debug, Clone)]
pub struct MultipartExtractor {
    field_name: String,
    max_payload_bytes: usize,
}

impl MultipartExtractor {
    pub fn new(field_name: impl Into<String>, max_payload_bytes: usize) -> Self {
        Self {
            field_name: field_name.into(),
            max_payload_bytes,
        }
    }

    /// Return the payload of the first part whose disposition names the field.
    pub fn extract(&self, body: &Bytes, boundary: &str) -> Result<Bytes> {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());

        let segments = split(body, &delimiter);

        // No delimiter at all: there is no candidate part to look at.
        if segments.len() < 2 {
            return Err(DetectError::NotFound);
        }

        let closing_ok = segments
            .last()
            .map(|&(s, e)| &body[s..e] == CLOSING)
            .unwrap_or(false);
        if !closing_ok {
            return Err(DetectError::MalformedBody);
        }

        for &(seg_start, seg_end) in &segments {
            let part = &body[seg_start..seg_end];
            let Some((payload_start, payload_end)) = self.locate_payload(part) else {
                continue;
            };

            let len = payload_end - payload_start;
            if len > self.max_payload_bytes {
                return Err(DetectError::PayloadTooLarge {
                    actual: len,
                    limit: self.max_payload_bytes,
                });
            }

            return Ok(body.slice(seg_start + payload_start..seg_start + payload_end));
        }

        Err(DetectError::NotFound)
    }

    /// Payload range within `part` if the part matches the field.
    fn locate_payload(&self, part: &[u8]) -> Option<(usize, usize)> {
        let line_start = find(part, DISPOSITION_LINE, 0)? + DISPOSITION_LINE.len();
        let line_end = find(part, CRLF, line_start)?;

        let header = std::str::from_utf8(&part[line_start..line_end]).ok()?;
        if !self.matches(&parse_params(header)) {
            return None;
        }

        let payload_start = find(part, HEADER_END, line_end)? + HEADER_END.len();
        if !part.ends_with(CRLF) {
            return None;
        }
        let payload_end = part.len() - CRLF.len();
        if payload_start > payload_end {
            return None;
        }
        Some((payload_start, payload_end))
    }

    fn matches(&self, params: &[(String, String)]) -> bool {
        let field = self.field_name.as_str();
        let expected = [("form-data", ""), ("name", field), ("filename", field)];
        params.len() == expected.len()
            && params
                .iter()
                .zip(expected.iter())
                .all(|((k, v), (ek, ev))| k == ek && v == ev)
    }
}

/// Split `haystack` on every non-overlapping `needle`, returning segment ranges.
fn split(haystack: &[u8], needle: &[u8]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    while let Some(at) = find(haystack, needle, start) {
        out.push((start, at));
        start = at + needle.len();
    }
    out.push((start, haystack.len()));
    out
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Parse a header value into `(key, value)` parameters.
///
/// The first entry is the disposition type with an empty value. Keys are
/// lowercased, values are unquoted, `;` inside quotes does not split.
pub fn parse_params(header: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (i, raw) in split_params(header).into_iter().enumerate() {
        let p = raw.trim();
        if p.is_empty() {
            continue;
        }
        match p.split_once('=') {
            Some((k, v)) if i > 0 => {
                out.push((k.trim().to_ascii_lowercase(), unquote(v.trim())));
            }
            _ => out.push((p.to_string(), String::new())),
        }
    }
    out
}

fn split_params(header: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in header.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&header[start..]);
    out
}

fn unquote(v: &str) -> String {
    match v.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => v.to_string(),
    }
}
