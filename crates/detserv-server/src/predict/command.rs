//! Inference through an external process.
//!
//! The image is staged as a file in a scratch directory (tmpfs by default),
//! the configured command is run with
//! `--engine <path> --image <file> --imgsz <n> [--half]`, and stdout is read
//! as a JSON array of [`RawResult`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;

use detserv_core::error::{DetectError, Result};

use super::{InferenceEngine, InferenceOptions, RawResult};
use crate::config::ModelSection;

pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    engine_path: PathBuf,
    scratch_dir: PathBuf,
    seq: AtomicU64,
}

impl CommandEngine {
    pub fn new(
        command: &[String],
        engine_path: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| DetectError::Config("model.command must not be empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            engine_path: engine_path.into(),
            scratch_dir: scratch_dir.into(),
            seq: AtomicU64::new(0),
        })
    }

    pub fn from_config(cfg: &ModelSection) -> Result<Self> {
        Self::new(&cfg.command, cfg.engine_path.clone(), cfg.scratch_dir.clone())
    }

    fn scratch_path(&self) -> PathBuf {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir
            .join(format!("detserv-{}-{n}.jpg", std::process::id()))
    }
}

#[async_trait]
impl InferenceEngine for CommandEngine {
    async fn infer(&self, image: Bytes, options: InferenceOptions) -> Result<Vec<RawResult>> {
        let staged = ScratchFile::write(self.scratch_path(), &image).await?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--engine")
            .arg(&self.engine_path)
            .arg("--image")
            .arg(staged.path())
            .arg("--imgsz")
            .arg(options.image_size.to_string())
            .kill_on_drop(true);
        if options.half_precision {
            cmd.arg("--half");
        }

        let output = cmd.output().await.map_err(|e| {
            DetectError::Inference(format!("failed to run {}: {e}", self.program))
        })?;
        drop(staged);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectError::Inference(format!(
                "inference command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| DetectError::Inference(format!("invalid inference output: {e}")))
    }
}

/// Staged image; removed when dropped, including on cancellation.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// The guard exists before the file does, so a partial write is removed too.
    async fn write(path: PathBuf, data: &[u8]) -> Result<Self> {
        let staged = Self { path };
        tokio::fs::write(&staged.path, data).await.map_err(|e| {
            DetectError::Inference(format!(
                "failed to stage image {}: {e}",
                staged.path.display()
            ))
        })?;
        Ok(staged)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            // Creation itself failed; nothing to clean up.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staged image");
            }
        }
    }
}
