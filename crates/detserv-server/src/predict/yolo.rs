use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use detserv_core::error::{DetectError, Result};
use detserv_core::metrics::{
    tags, Clock, EventMetricsTracker, MetricField, MetricPoint, SystemClock, Tags,
};
use detserv_core::{CocoLabel, Prediction};

use super::{InferenceEngine, InferenceOptions, Predictor, RawResult};
use crate::obs::{MetricsSink, NullSink};

pub const INPUT_MEASUREMENT: &str = "prediction_input";
pub const OUTPUT_MEASUREMENT: &str = "prediction_output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum InputField {
    ImageBytes,
}

impl MetricField for InputField {
    fn name(&self) -> &'static str {
        match self {
            InputField::ImageBytes => "image_bytes",
        }
    }
}

/// Predictor over a YOLO-style engine.
pub struct YoloPredictor {
    engine: Arc<dyn InferenceEngine>,
    options: InferenceOptions,
    sink: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
}

impl YoloPredictor {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        options: InferenceOptions,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self::with_clock(engine, options, sink, Arc::new(SystemClock::default()))
    }

    pub fn with_clock(
        engine: Arc<dyn InferenceEngine>,
        options: InferenceOptions,
        sink: Arc<dyn MetricsSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            options,
            sink,
            clock,
        }
    }

    fn record_image_size(&self, image: &Bytes) {
        let mut tracker = EventMetricsTracker::with_clock(Arc::clone(&self.clock));
        let len = i64::try_from(image.len()).unwrap_or(i64::MAX);
        tracker.record(InputField::ImageBytes, len, Tags::new());
        self.emit(tracker.finalize(INPUT_MEASUREMENT, &Tags::new()));
    }

    fn record_categories(&self, predictions: &[Prediction]) {
        let mut tracker = EventMetricsTracker::with_clock(Arc::clone(&self.clock));
        for p in predictions {
            tracker.increment(
                CocoLabel::from_label(p.label()),
                tags([("confidence_percent", p.confidence_percent())]),
            );
        }
        if tracker.is_empty() {
            return;
        }

        let mut extra = tags([("model_precision", self.options.precision())]);
        extra.insert("model_image_size".into(), self.options.image_size.into());
        self.emit(tracker.finalize(OUTPUT_MEASUREMENT, &extra));
    }

    fn emit(&self, points: Result<Vec<MetricPoint>>) {
        match points {
            Ok(points) => self.sink.put(points),
            Err(e) => tracing::error!(error = %e, "event tracker misuse"),
        }
    }
}

#[async_trait]
impl Predictor for YoloPredictor {
    async fn predict(&self, image: Bytes) -> Result<Vec<Prediction>> {
        self.record_image_size(&image);

        let results = self.engine.infer(image, self.options).await?;
        let predictions = to_predictions(results)?;

        self.record_categories(&predictions);
        Ok(predictions)
    }
}

/// Convert engine output for a single image into predictions.
fn to_predictions(results: Vec<RawResult>) -> Result<Vec<Prediction>> {
    let [result] = <[RawResult; 1]>::try_from(results).map_err(|r| {
        DetectError::Inference(format!(
            "There must be exactly 1 result, got {} instead",
            r.len()
        ))
    })?;

    let boxes = result
        .boxes
        .ok_or_else(|| DetectError::Inference("Boxes cannot be None".into()))?;

    if boxes.xyxy.len() != boxes.conf.len() || boxes.xyxy.len() != boxes.cls.len() {
        tracing::warn!(
            xyxy = boxes.xyxy.len(),
            conf = boxes.conf.len(),
            cls = boxes.cls.len(),
            "box columns differ in length; extra entries ignored"
        );
    }

    boxes
        .xyxy
        .iter()
        .zip(&boxes.conf)
        .zip(&boxes.cls)
        .map(|((xyxy, confidence), class_id)| {
            let id = *class_id as u32;
            let label = result
                .names
                .get(&id)
                .ok_or_else(|| DetectError::Inference(format!("unknown class id {id}")))?;
            // Coordinates truncate toward zero.
            Prediction::new(
                xyxy[0] as i64,
                xyxy[2] as i64,
                xyxy[1] as i64,
                xyxy[3] as i64,
                label.as_str(),
                *confidence,
            )
        })
        .collect()
}

/// Run one prediction so the engine is loaded before traffic arrives.
///
/// Metrics are not emitted for this call.
pub async fn warm_up(
    engine: Arc<dyn InferenceEngine>,
    options: InferenceOptions,
    image_path: &Path,
) -> Result<usize> {
    let image = tokio::fs::read(image_path).await.map_err(|e| {
        DetectError::Config(format!(
            "read warm-up image {} failed: {e}",
            image_path.display()
        ))
    })?;
    let predictor = YoloPredictor::new(engine, options, Arc::new(NullSink));
    let predictions = predictor.predict(Bytes::from(image)).await?;
    Ok(predictions.len())
}
