use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::json;

use detserv_core::error::{DetectError, Result};
use detserv_core::metrics::{tags, Checkpoint, PerformanceTracker};
use detserv_core::multipart::parse_params;

use crate::app_state::AppState;

/// The single detection route.
pub const DETECTION_PATH: &str = "/v1/vision/detection";

/// Measurement name of the per-request timing point.
pub const MEASUREMENT: &str = "http_request_dispatcher";

/// Timed phases of one detection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceCheckpoint {
    ParseRequestBody,
    ParseMultipartBoundary,
    ComputeResponse,
    SendResponse,
}

impl Checkpoint for PerformanceCheckpoint {
    fn name(&self) -> &'static str {
        match self {
            PerformanceCheckpoint::ParseRequestBody => "parse_request_body",
            PerformanceCheckpoint::ParseMultipartBoundary => "parse_multipart_boundary",
            PerformanceCheckpoint::ComputeResponse => "compute_response",
            PerformanceCheckpoint::SendResponse => "send_response",
        }
    }
}

/// Lifecycle of one detection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Ready,
    ParsingBody,
    ParsingBoundary,
    ComputingResponse,
    SendingResponse,
    Done,
    Failed,
}

type Tracker = PerformanceTracker<PerformanceCheckpoint>;

/// Drives one request through parse -> compute -> respond and emits its
/// timing point. Built fresh per request.
pub struct RequestDispatcher {
    app: AppState,
    state: DispatchState,
}

impl RequestDispatcher {
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            state: DispatchState::Ready,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    fn transition(&mut self, next: DispatchState) {
        tracing::debug!(from = ?self.state, to = ?next, "dispatch state");
        self.state = next;
    }

    pub async fn dispatch(&mut self, request: Request) -> Response {
        let tracker = Tracker::with_clock(self.app.clock());

        let (status, body) = match self.compute(&tracker, request).await {
            Ok(body) => {
                self.transition(DispatchState::SendingResponse);
                (StatusCode::OK, body)
            }
            Err(e) => {
                self.transition(DispatchState::Failed);
                tracing::info!(class = e.class().as_str(), error = %e, "rejected detection request");
                (StatusCode::BAD_REQUEST, error_body(&e))
            }
        };

        let response = {
            let _guard = self.open(&tracker, PerformanceCheckpoint::SendResponse);
            json_response(status, body)
        };

        if self.state == DispatchState::SendingResponse {
            self.transition(DispatchState::Done);
        }
        self.emit(&tracker, status);
        response
    }

    async fn compute(&mut self, tracker: &Tracker, request: Request) -> Result<String> {
        let (parts, body) = request.into_parts();

        self.transition(DispatchState::ParsingBody);
        let body = {
            let _guard = tracker.open(PerformanceCheckpoint::ParseRequestBody)?;
            read_body(&parts.headers, body, self.app.cfg().server.max_body_bytes).await?
        };

        self.transition(DispatchState::ParsingBoundary);
        let boundary = {
            let _guard = tracker.open(PerformanceCheckpoint::ParseMultipartBoundary)?;
            multipart_boundary(&parts.headers)?
        };

        self.transition(DispatchState::ComputingResponse);
        let _guard = tracker.open(PerformanceCheckpoint::ComputeResponse)?;
        self.app.handler().get_response(&body, &boundary).await
    }

    fn open<'t>(
        &self,
        tracker: &'t Tracker,
        checkpoint: PerformanceCheckpoint,
    ) -> Option<detserv_core::metrics::CheckpointGuard<'t, PerformanceCheckpoint>> {
        match tracker.open(checkpoint) {
            Ok(g) => Some(g),
            Err(e) => {
                tracing::error!(error = %e, "performance tracker misuse");
                None
            }
        }
    }

    fn emit(&self, tracker: &Tracker, status: StatusCode) {
        let tags = tags([("response_code", status.as_u16())]);
        match tracker.finalize(MEASUREMENT, &tags) {
            Ok(point) => self.app.sink().put(vec![point]),
            Err(e) => tracing::error!(error = %e, "performance tracker misuse"),
        }
    }
}

/// axum entry for `POST /v1/vision/detection`.
pub async fn detect(State(app): State<AppState>, request: Request) -> Response {
    RequestDispatcher::new(app).dispatch(request).await
}

async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes> {
    let content_length = match headers.get(header::CONTENT_LENGTH) {
        None => 0,
        Some(v) => v
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| DetectError::MalformedRequest("Invalid Content-Length".into()))?,
    };
    if content_length == 0 {
        return Err(DetectError::MalformedRequest(
            "Expected Content-Length to be > 0".into(),
        ));
    }

    // Blocks until the declared length arrives or the peer goes away.
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| DetectError::MalformedRequest(format!("Failed to read request body: {e}")))
}

fn multipart_boundary(headers: &HeaderMap) -> Result<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| DetectError::MalformedRequest("Missing Content-Type".into()))?
        .to_str()
        .map_err(|_| DetectError::MalformedRequest("Content-Type is not valid text".into()))?;

    let params = parse_params(content_type);
    let mime_type = params.first().map(|(k, _)| k.as_str()).unwrap_or_default();
    if !mime_type.eq_ignore_ascii_case("multipart/form-data") {
        return Err(DetectError::MalformedRequest(format!(
            "Expected mime type to be \"multipart/form-data\", got \"{mime_type}\" instead"
        )));
    }

    params
        .iter()
        .skip(1)
        .find(|(k, v)| k == "boundary" && !v.is_empty())
        .map(|(_, v)| v.clone())
        .ok_or_else(|| DetectError::MalformedRequest("Missing \"boundary\" in Content-Type".into()))
}

fn error_body(e: &DetectError) -> String {
    json!({
        "class": e.class().as_str(),
        "message": e.to_string(),
        "traceback": e.trace(),
    })
    .to_string()
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
