//! Operational HTTP endpoints.
//!
//! - `HEAD /v1/vision/detection` : liveness, empty 200
//! - any other path             : 404 (HEAD always answers 200)

use axum::{
    http::{Method, StatusCode},
    response::IntoResponse,
};

pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn fallback(method: Method) -> impl IntoResponse {
    if method == Method::HEAD {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}
