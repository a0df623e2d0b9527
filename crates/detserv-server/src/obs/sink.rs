//! Metric sinks.
//!
//! `put` is fire-and-forget: it never blocks on I/O and never reports
//! failure to the caller. The line-protocol sink hands points to a writer
//! task over an unbounded channel.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use detserv_core::metrics::MetricPoint;

pub trait MetricsSink: Send + Sync {
    fn put(&self, points: Vec<MetricPoint>);
}

/// Drops everything. Used when metrics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn put(&self, _points: Vec<MetricPoint>) {}
}

/// Keeps points in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    points: Mutex<Vec<MetricPoint>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    pub fn take(&self) -> Vec<MetricPoint> {
        std::mem::take(&mut *self.points.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Collected points rendered as line protocol, without draining.
    pub fn lines(&self) -> Vec<String> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(MetricPoint::to_line_protocol)
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn put(&self, points: Vec<MetricPoint>) {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(points);
    }
}

/// Appends line protocol to a file from a background task.
///
/// The writer exits once every clone of the sender is dropped and the
/// queue is drained.
#[derive(Debug, Clone)]
pub struct LineProtocolSink {
    tx: mpsc::UnboundedSender<Vec<MetricPoint>>,
}

impl LineProtocolSink {
    /// Spawn the writer task. Must be called inside a tokio runtime.
    pub fn spawn(path: PathBuf) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_loop(path, rx));
        (Self { tx }, handle)
    }
}

impl MetricsSink for LineProtocolSink {
    fn put(&self, points: Vec<MetricPoint>) {
        if points.is_empty() {
            return;
        }
        if self.tx.send(points).is_err() {
            tracing::warn!("metrics writer stopped; points dropped");
        }
    }
}

async fn write_loop(path: PathBuf, mut rx: mpsc::UnboundedReceiver<Vec<MetricPoint>>) {
    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot open metrics file; metrics disabled");
            while rx.recv().await.is_some() {}
            return;
        }
    };

    while let Some(batch) = rx.recv().await {
        let mut buf = String::new();
        for p in &batch {
            buf.push_str(&p.to_line_protocol());
            buf.push('\n');
        }
        if let Err(e) = file.write_all(buf.as_bytes()).await {
            tracing::warn!(path = %path.display(), error = %e, points = batch.len(), "metrics write failed");
            continue;
        }
        if let Err(e) = file.flush().await {
            tracing::warn!(path = %path.display(), error = %e, "metrics flush failed");
        }
    }

    tracing::debug!(path = %path.display(), "metrics writer finished");
}
