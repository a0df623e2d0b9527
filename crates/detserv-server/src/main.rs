//! Detection server binary.
//!
//! - Endpoint: POST /v1/vision/detection (multipart image -> JSON detections)
//! - Liveness: HEAD on any path
//! - Per-request timing and prediction metrics as line protocol

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use detserv_core::error::{DetectError, Result};
use detserv_server::obs::{LineProtocolSink, MetricsSink, NullSink};
use detserv_server::predict::{self, CommandEngine, InferenceEngine, YoloPredictor};
use detserv_server::{app_state, config, router};

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "detserv", version, about = "Object detection HTTP server")]
struct Args {
    /// YAML config file.
    #[arg(long, default_value = "detserv.yaml")]
    config: PathBuf,

    /// Override `server.listen`.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(class = e.class().as_str(), error = %e, "detserv failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = config::load_from_file(&args.config.to_string_lossy())?;
    if let Some(listen) = args.listen {
        cfg.server.listen = listen;
        cfg.validate()?;
    }
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| DetectError::Config(format!("server.listen: {e}")))?;

    let mut writer = None;
    let sink: Arc<dyn MetricsSink> = if cfg.metrics.enabled {
        let (sink, handle) = LineProtocolSink::spawn(cfg.metrics.path.clone());
        writer = Some(handle);
        tracing::info!(path = %cfg.metrics.path.display(), "metrics enabled");
        Arc::new(sink)
    } else {
        Arc::new(NullSink)
    };

    let options = cfg.model.inference_options();
    let engine: Arc<dyn InferenceEngine> = Arc::new(CommandEngine::from_config(&cfg.model)?);

    if let Some(image) = &cfg.model.warmup_image {
        let n = predict::warm_up(Arc::clone(&engine), options, image).await?;
        tracing::info!(image = %image.display(), predictions = n, "model warmed up");
    }

    let predictor = Arc::new(YoloPredictor::new(engine, options, Arc::clone(&sink)));
    let state = app_state::AppState::new(cfg, predictor, sink);
    let app = router::build_router(state);

    tracing::info!(%listen, "detserv starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| DetectError::Config(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DetectError::Internal(format!("server failed: {e}")))?;

    // The router (and every sink clone in it) is gone; the writer drains and exits.
    if let Some(writer) = writer {
        match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "metrics writer task failed"),
            Err(_) => tracing::warn!("metrics writer did not drain in time"),
        }
    }

    tracing::info!("detserv stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl_c handler failed; shutting down");
    }
    tracing::info!("shutdown requested");
}
