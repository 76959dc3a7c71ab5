//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{parse_service, StreamerConfig};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    server: ServerInfo,
    pose: PoseInfo,
    streaming: StreamingInfo,
    clock: ClockInfo,
    simulator: SimulatorInfo,
}

#[derive(Serialize)]
struct ServerInfo {
    service: String,
    bind_addr: String,
}

#[derive(Serialize)]
struct PoseInfo {
    node_id: String,
    reference_frame: String,
}

#[derive(Serialize)]
struct StreamingInfo {
    sensor_type: String,
    label: String,
    release_policy: String,
}

#[derive(Serialize)]
struct ClockInfo {
    /// "wall-clock anchored" when unset
    epoch_offset: String,
}

#[derive(Serialize)]
struct SimulatorInfo {
    frequency_hz: f64,
    frame_interval_ms: f64,
    tracking_loss_period_secs: u64,
    tracking_loss_secs: u64,
    orbit_radius_m: f32,
    orbit_period_secs: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;
    let info = build_config_info(&config);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &StreamerConfig) -> ConfigInfo {
    let bind_addr = parse_service(&config.server.service)
        .map(|addr| addr.to_string())
        .unwrap_or_else(|e| format!("(invalid: {e})"));

    ConfigInfo {
        version: format!("{:?}", config.version),
        server: ServerInfo {
            service: config.server.service.clone(),
            bind_addr,
        },
        pose: PoseInfo {
            node_id: config.pose.node_id.to_string(),
            reference_frame: config.pose.reference_frame.to_string(),
        },
        streaming: StreamingInfo {
            sensor_type: config.streaming.sensor_type.to_string(),
            label: config.streaming.sensor_type.label().to_string(),
            release_policy: format!("{:?}", config.streaming.release_policy),
        },
        clock: ClockInfo {
            epoch_offset: config
                .clock
                .epoch_offset_ticks
                .map(|t| t.to_string())
                .unwrap_or_else(|| "wall-clock anchored".to_string()),
        },
        simulator: SimulatorInfo {
            frequency_hz: config.simulator.frequency_hz,
            frame_interval_ms: 1000.0 / config.simulator.frequency_hz,
            tracking_loss_period_secs: config.simulator.tracking_loss_period_secs,
            tracking_loss_secs: config.simulator.tracking_loss_secs,
            orbit_radius_m: config.simulator.orbit_radius_m,
            orbit_period_secs: config.simulator.orbit_period_secs,
        },
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               RM Streamer Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🌐 Server");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Service: {}", info.server.service);
    println!("   └─ Binds: {}", info.server.bind_addr);

    println!("\n📍 Pose");
    println!("   ├─ Node: {}", info.pose.node_id);
    println!("   └─ Reference frame: {}", info.pose.reference_frame);

    println!("\n📤 Streaming");
    println!(
        "   ├─ Sensor: {} ({})",
        info.streaming.sensor_type, info.streaming.label
    );
    println!("   └─ Release policy: {}", info.streaming.release_policy);

    println!("\n⏱️  Clock");
    println!("   └─ Epoch offset: {}", info.clock.epoch_offset);

    let sim = &info.simulator;
    println!("\n🛰️  Simulator");
    println!(
        "   ├─ Frequency: {} Hz ({:.2} ms)",
        sim.frequency_hz, sim.frame_interval_ms
    );
    if sim.tracking_loss_period_secs == 0 {
        println!("   ├─ Tracking loss: never");
    } else {
        println!(
            "   ├─ Tracking loss: {}s every {}s",
            sim.tracking_loss_secs, sim.tracking_loss_period_secs
        );
    }
    println!(
        "   └─ Orbit: {} m radius, {} s period",
        sim.orbit_radius_m, sim.orbit_period_secs
    );

    println!();
}
