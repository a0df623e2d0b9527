use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use detserv_core::error::{DetectError, Result};
use detserv_core::{MultipartExtractor, Prediction};

use crate::predict::Predictor;

/// Detection response body.
#[derive(Debug, Serialize)]
pub struct DetectionResponse {
    pub predictions: Vec<Prediction>,
    pub success: bool,
}

/// Extracts the image and runs the predictor.
///
/// Extraction errors propagate (the request was malformed). Predictor
/// errors are logged and become `{"predictions": [], "success": false}`.
pub struct DetectionRequestHandler {
    extractor: MultipartExtractor,
    predictor: Arc<dyn Predictor>,
    log_response: bool,
}

impl DetectionRequestHandler {
    pub fn new(extractor: MultipartExtractor, predictor: Arc<dyn Predictor>, log_response: bool) -> Self {
        Self {
            extractor,
            predictor,
            log_response,
        }
    }

    pub async fn get_response(&self, body: &Bytes, boundary: &str) -> Result<String> {
        let image = self.extractor.extract(body, boundary)?;

        let response = match self.predictor.predict(image).await {
            Ok(predictions) => DetectionResponse {
                predictions,
                success: true,
            },
            Err(e) => {
                tracing::error!(class = e.class().as_str(), error = %e, "Detection failed");
                DetectionResponse {
                    predictions: Vec::new(),
                    success: false,
                }
            }
        };

        if self.log_response {
            tracing::info!(?response, "detection response");
        }

        serde_json::to_string(&response)
            .map_err(|e| DetectError::Internal(format!("serialize response failed: {e}")))
    }
}
