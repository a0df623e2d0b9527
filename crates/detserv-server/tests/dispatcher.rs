//! End-to-end tests through the axum router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use detserv_core::metrics::ScriptedClock;
use detserv_core::{DetectError, Prediction, Result};
use detserv_server::app_state::AppState;
use detserv_server::config;
use detserv_server::dispatch::{DispatchState, RequestDispatcher};
use detserv_server::obs::{MemorySink, MetricsSink};
use detserv_server::predict::Predictor;
use detserv_server::router::build_router;

const WALL: i64 = 1_700_000_000_000_000_000;
const READINGS: [u64; 8] = [42, 69, 100, 420, 500, 690, 1000, 4200];
const BOUNDARY: &str = "241a860e9a94d2780e8e67095c27a662";

enum Outcome {
    Detect(Vec<Prediction>),
    Fail,
}

struct FixedPredictor(Outcome);

#[async_trait]
impl Predictor for FixedPredictor {
    async fn predict(&self, _image: Bytes) -> Result<Vec<Prediction>> {
        match &self.0 {
            Outcome::Detect(p) => Ok(p.clone()),
            Outcome::Fail => Err(DetectError::Inference("engine unavailable".into())),
        }
    }
}

struct Harness {
    app: Router,
    state: AppState,
    sink: Arc<MemorySink>,
}

fn harness(outcome: Outcome) -> Harness {
    let cfg = config::load_from_str(
        r#"
version: 1
server:
  max_body_bytes: 512
detection:
  max_image_bytes: 20
model:
  command: ["infer"]
  engine_path: "m.engine"
"#,
    )
    .unwrap();

    let sink = Arc::new(MemorySink::new());
    let metrics: Arc<dyn MetricsSink> = sink.clone();
    let state = AppState::with_clock(
        cfg,
        Arc::new(FixedPredictor(outcome)),
        metrics,
        Arc::new(ScriptedClock::new(READINGS, WALL)),
    );
    Harness {
        app: build_router(state.clone()),
        state,
        sink,
    }
}

fn dog() -> Prediction {
    Prediction::new(1, 2, 3, 4, "dog", 0.5).unwrap()
}

fn image_body(payload: &str) -> String {
    [
        "",
        &format!("--{BOUNDARY}"),
        r#"Content-Disposition: form-data; name="image"; filename="image""#,
        "Content-Type: image/jpeg",
        "",
        payload,
        &format!("--{BOUNDARY}--"),
        "",
    ]
    .join("\r\n")
}

fn detection(body: impl Into<Bytes>, content_type: Option<&str>) -> Request<Body> {
    let body = body.into();
    let mut req = Request::builder()
        .method(Method::POST)
        .uri("/v1/vision/detection")
        .header(header::CONTENT_LENGTH, body.len());
    if let Some(ct) = content_type {
        req = req.header(header::CONTENT_TYPE, ct);
    }
    req.body(Body::from(body)).unwrap()
}

fn multipart() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Option<String>, Bytes) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = res.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, body)
}

async fn send_error(app: Router, req: Request<Body>) -> Value {
    let (status, content_type, body) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn detection_success() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let (status, content_type, body) =
        send(h.app, detection(image_body("jpeg-bytes"), Some(&multipart()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        r#"{"predictions":[{"x_min":1,"x_max":2,"y_min":3,"y_max":4,"label":"dog","confidence":0.5}],"success":true}"#
    );
    assert_eq!(
        h.sink.lines(),
        vec![
            "http_request_dispatcher,response_code=200 compute_response_ns=190i,\
             parse_multipart_boundary_ns=320i,parse_request_body_ns=27i,\
             send_response_ns=3200i 1700000000000000000"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn predictor_failure_is_unsuccessful_200() {
    let h = harness(Outcome::Fail);
    let (status, _, body) =
        send(h.app, detection(image_body("jpeg-bytes"), Some(&multipart()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        r#"{"predictions":[],"success":false}"#
    );
    assert_eq!(h.sink.take().len(), 1);
}

#[tokio::test]
async fn no_image_part_is_not_found() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let v = send_error(h.app, detection(&b"12345"[..], Some(&multipart()))).await;

    assert_eq!(v["class"], "NotFound");
    assert_eq!(v["message"], "No image data was found");
    assert_eq!(v["traceback"], Value::Array(Vec::new()));
    assert_eq!(
        h.sink.lines(),
        vec![
            "http_request_dispatcher,response_code=400 compute_response_ns=190i,\
             parse_multipart_boundary_ns=320i,parse_request_body_ns=27i,\
             send_response_ns=3200i 1700000000000000000"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn empty_body_is_rejected_while_reading() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let v = send_error(h.app, detection(Bytes::new(), Some(&multipart()))).await;

    assert_eq!(v["class"], "MalformedRequest");
    assert_eq!(v["message"], "Expected Content-Length to be > 0");
    assert_eq!(
        h.sink.lines(),
        vec![
            "http_request_dispatcher,response_code=400 parse_request_body_ns=27i,\
             send_response_ns=320i 1700000000000000000"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn missing_content_length_is_rejected() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let req = Request::builder()
        .method(Method::POST)
        .uri("/v1/vision/detection")
        .header(header::CONTENT_TYPE, multipart())
        .body(Body::from(image_body("jpeg-bytes")))
        .unwrap();
    let v = send_error(h.app, req).await;
    assert_eq!(v["message"], "Expected Content-Length to be > 0");
}

#[tokio::test]
async fn body_over_read_limit_is_rejected() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let v = send_error(h.app, detection(vec![b'x'; 1024], Some(&multipart()))).await;

    assert_eq!(v["class"], "MalformedRequest");
    let message = v["message"].as_str().unwrap();
    assert!(message.starts_with("Failed to read request body"), "{message}");
}

#[tokio::test]
async fn missing_content_type() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let v = send_error(h.app, detection(image_body("jpeg-bytes"), None)).await;

    assert_eq!(v["class"], "MalformedRequest");
    assert_eq!(v["message"], "Missing Content-Type");
    assert_eq!(
        h.sink.lines(),
        vec![
            "http_request_dispatcher,response_code=400 parse_multipart_boundary_ns=320i,\
             parse_request_body_ns=27i,send_response_ns=190i 1700000000000000000"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn wrong_mime_type() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let ct = format!("invalid/mime-type; boundary={BOUNDARY}");
    let v = send_error(h.app, detection(image_body("jpeg-bytes"), Some(&ct))).await;
    assert_eq!(v["class"], "MalformedRequest");
    assert_eq!(
        v["message"],
        r#"Expected mime type to be "multipart/form-data", got "invalid/mime-type" instead"#
    );
}

#[tokio::test]
async fn mime_type_is_case_insensitive() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let ct = format!("Multipart/Form-Data; boundary=\"{BOUNDARY}\"");
    let (status, _, _) = send(h.app, detection(image_body("jpeg-bytes"), Some(&ct))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_boundary() {
    for ct in ["multipart/form-data", "multipart/form-data; boundary=", "multipart/form-data; charset=utf-8"] {
        let h = harness(Outcome::Detect(vec![dog()]));
        let v = send_error(h.app, detection(image_body("jpeg-bytes"), Some(ct))).await;
        assert_eq!(v["message"], r#"Missing "boundary" in Content-Type"#, "{ct}");
    }
}

#[tokio::test]
async fn oversized_image() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let payload = "x".repeat(38);
    let v = send_error(h.app, detection(image_body(&payload), Some(&multipart()))).await;

    assert_eq!(v["class"], "PayloadTooLarge");
    assert_eq!(
        v["message"],
        "Image size of 38 bytes is too big, must be <= 20 bytes"
    );
}

#[tokio::test]
async fn unterminated_body() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let body = image_body("jpeg-bytes").replace(&format!("--{BOUNDARY}--"), "trailer");
    let v = send_error(h.app, detection(body, Some(&multipart()))).await;

    assert_eq!(v["class"], "MalformedBody");
    assert_eq!(v["message"], "No terminating boundary was found");
}

#[tokio::test]
async fn post_elsewhere_is_404() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let req = Request::builder()
        .method(Method::POST)
        .uri("/v1/vision/other")
        .header(header::CONTENT_LENGTH, 5)
        .body(Body::from("12345"))
        .unwrap();
    let (status, _, body) = send(h.app, req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
    assert!(h.sink.lines().is_empty());
}

#[tokio::test]
async fn head_is_liveness_on_any_path() {
    for uri in ["/v1/vision/detection", "/", "/anything/else"] {
        let h = harness(Outcome::Fail);
        let req = Request::builder()
            .method(Method::HEAD)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(h.app, req).await;

        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body.is_empty());
        assert!(h.sink.lines().is_empty());
    }
}

#[tokio::test]
async fn concurrent_requests_emit_one_point_each() {
    let cfg = config::load_from_str(
        "version: 1\nmodel:\n  command: [\"infer\"]\n  engine_path: \"m.engine\"\n",
    )
    .unwrap();
    let sink = Arc::new(MemorySink::new());
    let metrics: Arc<dyn MetricsSink> = sink.clone();
    let app = build_router(AppState::new(
        cfg,
        Arc::new(FixedPredictor(Outcome::Detect(vec![dog()]))),
        metrics,
    ));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            send(app, detection(image_body("jpeg-bytes"), Some(&multipart()))).await.0
        }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }

    let points = sink.take();
    assert_eq!(points.len(), 8);
    for p in &points {
        assert_eq!(p.measurement(), "http_request_dispatcher");
        assert_eq!(p.fields().len(), 4);
    }
}

async fn dispatch_directly(h: &Harness, req: Request<Body>) -> (DispatchState, StatusCode, Bytes) {
    let mut dispatcher = RequestDispatcher::new(h.state.clone());
    assert_eq!(dispatcher.state(), DispatchState::Ready);
    let res = dispatcher.dispatch(req).await;
    let status = res.status();
    let body = res.into_body().collect().await.unwrap().to_bytes();
    (dispatcher.state(), status, body)
}

#[tokio::test]
async fn dispatcher_ends_done_on_success() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let (state, status, _) =
        dispatch_directly(&h, detection(image_body("jpeg-bytes"), Some(&multipart()))).await;

    assert_eq!(state, DispatchState::Done);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.sink.take().len(), 1);
}

#[tokio::test]
async fn dispatcher_ends_done_when_predictor_fails() {
    let h = harness(Outcome::Fail);
    let (state, status, body) =
        dispatch_directly(&h, detection(image_body("jpeg-bytes"), Some(&multipart()))).await;

    assert_eq!(state, DispatchState::Done);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        r#"{"predictions":[],"success":false}"#
    );
}

#[tokio::test]
async fn dispatcher_ends_failed_on_body_error() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let (state, status, _) = dispatch_directly(&h, detection(Bytes::new(), Some(&multipart()))).await;

    assert_eq!(state, DispatchState::Failed);
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dispatcher_ends_failed_on_boundary_error() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let (state, status, _) =
        dispatch_directly(&h, detection(image_body("jpeg-bytes"), Some("multipart/form-data"))).await;

    assert_eq!(state, DispatchState::Failed);
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dispatcher_ends_failed_on_extract_error() {
    let h = harness(Outcome::Detect(vec![dog()]));
    let (state, status, _) = dispatch_directly(&h, detection(&b"12345"[..], Some(&multipart()))).await;

    assert_eq!(state, DispatchState::Failed);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // The failed request is still timed.
    assert_eq!(h.sink.take().len(), 1);
}
