//! Shared application state for the detection server.
//!
//! Everything here is built once at startup and read by every request.

use std::sync::Arc;

use detserv_core::metrics::{Clock, SystemClock};
use detserv_core::MultipartExtractor;

use crate::config::ServerConfig;
use crate::dispatch::DetectionRequestHandler;
use crate::obs::MetricsSink;
use crate::predict::Predictor;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    handler: DetectionRequestHandler,
    sink: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(cfg: ServerConfig, predictor: Arc<dyn Predictor>, sink: Arc<dyn MetricsSink>) -> Self {
        Self::with_clock(cfg, predictor, sink, Arc::new(SystemClock::default()))
    }

    /// Same as [`AppState::new`] with an explicit clock for request timing.
    pub fn with_clock(
        cfg: ServerConfig,
        predictor: Arc<dyn Predictor>,
        sink: Arc<dyn MetricsSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let extractor = MultipartExtractor::new(
            cfg.detection.field_name.clone(),
            cfg.detection.max_image_bytes,
        );
        let handler = DetectionRequestHandler::new(extractor, predictor, cfg.detection.log_response);

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                handler,
                sink,
                clock,
            }),
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn handler(&self) -> &DetectionRequestHandler {
        &self.inner.handler
    }

    pub fn sink(&self) -> &dyn MetricsSink {
        self.inner.sink.as_ref()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }
}
