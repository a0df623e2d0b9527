//! Shared error type across detserv crates.

use thiserror::Error;

/// Client-facing error categories (stable API).
///
/// The string form is what a 400 response carries in its `class` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or invalid request headers.
    MalformedRequest,
    /// Multipart body without a terminating boundary.
    MalformedBody,
    /// No multipart part matched the expected field.
    NotFound,
    /// Image payload bigger than the configured limit.
    PayloadTooLarge,
    /// A detection violated the prediction invariants.
    InvalidPrediction,
    /// The inference collaborator failed.
    InferenceFailure,
    /// Programmer error when driving a tracker.
    TrackerMisuse,
    /// Invalid configuration.
    Config,
    /// Internal server error.
    Internal,
}

impl ErrorClass {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::MalformedRequest => "MalformedRequest",
            ErrorClass::MalformedBody => "MalformedBody",
            ErrorClass::NotFound => "NotFound",
            ErrorClass::PayloadTooLarge => "PayloadTooLarge",
            ErrorClass::InvalidPrediction => "InvalidPrediction",
            ErrorClass::InferenceFailure => "InferenceFailure",
            ErrorClass::TrackerMisuse => "TrackerMisuse",
            ErrorClass::Config => "Config",
            ErrorClass::Internal => "Internal",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, DetectError>;

/// Unified error type used by core and server.
///
/// `Display` is the exact human message sent back to clients.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("{0}")]
    MalformedRequest(String),
    #[error("No terminating boundary was found")]
    MalformedBody,
    #[error("No image data was found")]
    NotFound,
    #[error("Image size of {actual} bytes is too big, must be <= {limit} bytes")]
    PayloadTooLarge { actual: usize, limit: usize },
    #[error("invalid prediction: {0}")]
    InvalidPrediction(String),
    #[error("{0}")]
    Inference(String),
    #[error("{0}")]
    TrackerMisuse(String),
    #[error("{0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl DetectError {
    /// Map internal error to a stable client-facing category.
    pub fn class(&self) -> ErrorClass {
        match self {
            DetectError::MalformedRequest(_) => ErrorClass::MalformedRequest,
            DetectError::MalformedBody => ErrorClass::MalformedBody,
            DetectError::NotFound => ErrorClass::NotFound,
            DetectError::PayloadTooLarge { .. } => ErrorClass::PayloadTooLarge,
            DetectError::InvalidPrediction(_) => ErrorClass::InvalidPrediction,
            DetectError::Inference(_) => ErrorClass::InferenceFailure,
            DetectError::TrackerMisuse(_) => ErrorClass::TrackerMisuse,
            DetectError::Config(_) => ErrorClass::Config,
            DetectError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Messages of the `source()` chain, outermost first.
    pub fn trace(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = std::error::Error::source(self);
        while let Some(e) = cur {
            out.push(e.to_string());
            cur = e.source();
        }
        out
    }
}
