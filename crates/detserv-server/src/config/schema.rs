use std::path::PathBuf;

use serde::Deserialize;

use detserv_core::error::{DetectError, Result};
use detserv_core::multipart::DEFAULT_FIELD_NAME;

use crate::predict::InferenceOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub detection: DetectionSection,

    pub model: ModelSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DetectError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.detection.validate()?;
        self.model.validate()?;

        if self.server.max_body_bytes < self.detection.max_image_bytes {
            return Err(DetectError::Config(
                "server.max_body_bytes must be >= detection.max_image_bytes".into(),
            ));
        }
        if self.metrics.enabled && self.metrics.path.as_os_str().is_empty() {
            return Err(DetectError::Config(
                "metrics.path must be set when metrics are enabled".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Upper bound on bytes read from one request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(DetectError::Config(format!(
                "server.listen must be a valid socket address, got {:?}",
                self.listen
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectionSection {
    /// Inclusive limit on the extracted image payload.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    #[serde(default)]
    pub log_response: bool,

    #[serde(default = "default_field_name")]
    pub field_name: String,
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            log_response: false,
            field_name: default_field_name(),
        }
    }
}

impl DetectionSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_image_bytes == 0 {
            return Err(DetectError::Config(
                "detection.max_image_bytes must be > 0".into(),
            ));
        }
        if self.field_name.is_empty() {
            return Err(DetectError::Config(
                "detection.field_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    /// argv of the inference process; engine/image/size flags are appended.
    pub command: Vec<String>,

    pub engine_path: PathBuf,

    #[serde(default = "default_image_size")]
    pub image_size: u32,

    #[serde(default = "default_half_precision")]
    pub half_precision: bool,

    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Image predicted once at startup with metrics disabled.
    #[serde(default)]
    pub warmup_image: Option<PathBuf>,
}

impl ModelSection {
    pub fn validate(&self) -> Result<()> {
        if self.command.first().map_or(true, |p| p.is_empty()) {
            return Err(DetectError::Config("model.command must not be empty".into()));
        }
        if !(32..=4096).contains(&self.image_size) {
            return Err(DetectError::Config(
                "model.image_size must be between 32 and 4096".into(),
            ));
        }
        Ok(())
    }

    pub fn inference_options(&self) -> InferenceOptions {
        InferenceOptions {
            image_size: self.image_size,
            half_precision: self.half_precision,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default)]
    pub enabled: bool,

    /// Line-protocol output file.
    #[serde(default = "default_metrics_path")]
    pub path: PathBuf,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_metrics_path(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:32168".into()
}
fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_field_name() -> String {
    DEFAULT_FIELD_NAME.into()
}
fn default_image_size() -> u32 {
    320
}
fn default_half_precision() -> bool {
    true
}
fn default_scratch_dir() -> PathBuf {
    PathBuf::from("/dev/shm")
}
fn default_metrics_path() -> PathBuf {
    PathBuf::from("metrics.lp")
}
