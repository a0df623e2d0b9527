//! Detection request path.
//!
//! `dispatcher` owns the HTTP side (body, Content-Type, status, timing);
//! `handler` turns a body and boundary into the JSON response.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{
    detect, DispatchState, PerformanceCheckpoint, RequestDispatcher, DETECTION_PATH, MEASUREMENT,
};
pub use handler::{DetectionRequestHandler, DetectionResponse};
