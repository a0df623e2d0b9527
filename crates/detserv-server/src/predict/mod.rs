//! Inference seam.
//!
//! `Predictor` is what the request path calls. `YoloPredictor` turns raw
//! engine output into validated predictions and reports input/output
//! metrics. `InferenceEngine` is the external model; `CommandEngine` runs it
//! as a child process.

pub mod command;
pub mod yolo;

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use detserv_core::{Prediction, Result};

pub use command::CommandEngine;
pub use yolo::{warm_up, YoloPredictor};

/// Image bytes in, validated detections out.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, image: Bytes) -> Result<Vec<Prediction>>;
}

/// Knobs passed through to the engine on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceOptions {
    pub image_size: u32,
    pub half_precision: bool,
}

impl InferenceOptions {
    pub fn precision(&self) -> &'static str {
        if self.half_precision {
            "fp16"
        } else {
            "fp32"
        }
    }
}

/// Engine output for one image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub boxes: Option<RawBoxes>,
    /// Class id -> label.
    #[serde(default)]
    pub names: BTreeMap<u32, String>,
}

/// Column-wise boxes: `xyxy[i]`, `conf[i]`, `cls[i]` describe box `i`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBoxes {
    pub xyxy: Vec<[f64; 4]>,
    pub conf: Vec<f64>,
    pub cls: Vec<f64>,
}

/// The external detection model.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn infer(&self, image: Bytes, options: InferenceOptions) -> Result<Vec<RawResult>>;
}
