//! Time-series point and its line-protocol rendering.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Tag value: either text or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagValue {
    Str(String),
    Int(i64),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Str(s) => f.write_str(s),
            TagValue::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Str(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Str(v)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Int(v)
    }
}

impl From<u32> for TagValue {
    fn from(v: u32) -> Self {
        TagValue::Int(i64::from(v))
    }
}

impl From<u16> for TagValue {
    fn from(v: u16) -> Self {
        TagValue::Int(i64::from(v))
    }
}

/// Tag set. Ordered by key so equality and rendering ignore insertion order.
pub type Tags = BTreeMap<String, TagValue>;

/// Build a [`Tags`] from `(key, value)` pairs.
pub fn tags<K, V, I>(pairs: I) -> Tags
where
    K: Into<String>,
    V: Into<TagValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// One point: measurement, tags, integer fields, timestamp (Unix ns).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricPoint {
    measurement: String,
    tags: Tags,
    fields: BTreeMap<String, i64>,
    timestamp_ns: i64,
}

impl MetricPoint {
    pub fn new(measurement: impl Into<String>, timestamp_ns: i64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Tags::new(),
            fields: BTreeMap::new(),
            timestamp_ns,
        }
    }

    /// Set a tag, replacing any previous value for `key`.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add tags whose keys are not set yet. Existing tags win.
    pub fn merge_tags(mut self, extra: &Tags) -> Self {
        for (k, v) in extra {
            self.tags.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: i64) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }
    pub fn tags(&self) -> &Tags {
        &self.tags
    }
    pub fn fields(&self) -> &BTreeMap<String, i64> {
        &self.fields
    }
    pub fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }

    /// Render as one line of line protocol (no trailing newline).
    ///
    /// Tags with an empty value are skipped, the same as the metrics backend
    /// would do on ingest.
    pub fn to_line_protocol(&self) -> String {
        let mut out = String::new();
        escape_into(&mut out, &self.measurement, &[',', ' ']);

        for (k, v) in &self.tags {
            let v = v.to_string();
            if v.is_empty() {
                continue;
            }
            out.push(',');
            escape_into(&mut out, k, &[',', '=', ' ']);
            out.push('=');
            escape_into(&mut out, &v, &[',', '=', ' ']);
        }

        let mut first = true;
        for (k, v) in &self.fields {
            out.push(if first { ' ' } else { ',' });
            first = false;
            escape_into(&mut out, k, &[',', '=', ' ']);
            let _ = write!(out, "={v}i");
        }

        let _ = write!(out, " {}", self.timestamp_ns);
        out
    }
}

/// Backslash-escape `special`; control whitespace is written as `\n`, `\r`, `\t`.
fn escape_into(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}
