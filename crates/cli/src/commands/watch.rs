//! `watch` command implementation.
//!
//! Acts as the streamer's client: connects, decodes each message and prints
//! it until the streamer disconnects, `--count` is reached or Ctrl+C.

use anyhow::{Context, Result};
use serde::Serialize;
use streamer::{WireDecoder, WireMessage};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::cli::WatchArgs;
use crate::error::CliError;

/// One decoded message for JSON output
#[derive(Serialize)]
struct WatchedMessage<'a> {
    timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    utc: Option<String>,
    text: &'a str,
    transform: [f32; 16],
}

impl<'a> WatchedMessage<'a> {
    fn new(message: &'a WireMessage) -> Self {
        Self {
            timestamp: message.timestamp,
            utc: utc_string(message.timestamp),
            text: &message.text,
            transform: message.transform.to_row_major(),
        }
    }
}

fn utc_string(timestamp: u64) -> Option<String> {
    pose_resolver::absolute_ticks_to_datetime(timestamp).map(|t| t.to_rfc3339())
}

/// Execute the `watch` command
pub async fn run_watch(args: &WatchArgs) -> Result<()> {
    info!(addr = %args.addr, "Connecting to streamer");

    let mut stream = TcpStream::connect(args.addr.as_str())
        .await
        .map_err(|e| CliError::connect(args.addr.as_str(), e))?;

    info!(addr = %args.addr, "Connected");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut decoder = WireDecoder::new();
    let mut received = 0u64;

    loop {
        let message = tokio::select! {
            _ = &mut ctrl_c => {
                warn!("Interrupted");
                break;
            }
            message = decoder.read_message(&mut stream) => message,
        };

        let Some(message) = message.context("Failed to read from streamer")? else {
            info!("Streamer closed the connection");
            break;
        };
        received += 1;

        if args.json {
            let json = serde_json::to_string(&WatchedMessage::new(&message))
                .context("Failed to serialize message")?;
            println!("{}", json);
        } else {
            print_message(received, &message);
        }

        if args.count > 0 && received >= args.count {
            break;
        }
    }

    info!(received, "Watch finished");
    Ok(())
}

fn print_message(index: u64, message: &WireMessage) {
    let t = message.transform.translation();
    let when = utc_string(message.timestamp).unwrap_or_else(|| message.timestamp.to_string());
    println!(
        "#{:<6} {}  pos=({:.3}, {:.3}, {:.3})  {}",
        index,
        when,
        t.x,
        t.y,
        t.z,
        message.text.trim_end()
    );
}
