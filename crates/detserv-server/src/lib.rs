//! Detection server library entry.
//!
//! Wires config, metric sinks, the inference seam and the request dispatcher
//! into an axum router. Used by the binary (`main.rs`) and by integration
//! tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod predict;
pub mod router;
