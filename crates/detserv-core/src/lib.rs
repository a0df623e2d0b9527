//! detserv core: transport-agnostic detection primitives.
//!
//! This crate holds the multipart scanner, the validated prediction type,
//! the label vocabulary and the request-scoped metric trackers. It carries
//! no transport or runtime dependencies so the server and tests can share it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible
//! paths surface as `DetectError` so malformed uploads cannot take the
//! process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod label;
pub mod metrics;
pub mod multipart;
pub mod prediction;

/// Shared result type.
pub use error::{DetectError, ErrorClass, Result};
pub use label::CocoLabel;
pub use multipart::MultipartExtractor;
pub use prediction::Prediction;
