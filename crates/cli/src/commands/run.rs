//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use super::load_config;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{SessionConfig, ShutdownSignal, StreamSession, ToggleSignal};

/// Execute the `run` command
pub async fn run_stream(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut config = load_config(&args.config)?;

    // Apply CLI overrides
    if let Some(ref service) = args.service {
        info!(service = %service, "Overriding service from CLI");
        config.server.service = service.clone();
        config_loader::ConfigLoader::validate(&config)
            .map_err(|e| CliError::invalid_config(args.config.display().to_string(), e))?;
    }

    info!(
        service = %config.server.service,
        node_id = %config.pose.node_id,
        sensor_type = %config.streaming.sensor_type,
        release_policy = ?config.streaming.release_policy,
        "Configuration loaded"
    );

    let session_config = SessionConfig {
        streamer: config,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let shutdown = ShutdownSignal::install()?;
    let toggle = ToggleSignal::install()?;

    info!("Starting streamer (send SIGUSR1 to toggle streaming, Ctrl+C to stop)...");

    let stats = StreamSession::new(session_config)
        .run(shutdown.wait(), toggle)
        .await
        .context("Stream session failed")?;

    info!(
        written = stats.streamer.messages_written,
        skipped = stats.streamer.frames_skipped(),
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Stream session completed"
    );
    stats.print_summary();

    info!("RM Streamer finished");
    Ok(())
}
