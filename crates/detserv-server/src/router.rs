//! Axum router wiring.
//!
//! One detection route; HEAD doubles as a liveness probe.

use axum::{routing::post, Router};

use crate::{app_state::AppState, dispatch, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            dispatch::DETECTION_PATH,
            post(dispatch::detect).head(ops::liveness),
        )
        .fallback(ops::fallback)
        .with_state(state)
}
