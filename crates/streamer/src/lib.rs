//! # Streamer
//!
//! Pose-correlated sensor frame streaming over a single TCP client.
//!
//! Responsibilities:
//! - Accept one client at a time; a new connection replaces the old one
//! - Correlate every frame with the rig pose at its capture time
//! - Encode `(timestamp, text, transform)` into the binary wire format
//! - Keep at most one write in flight; frames arriving meanwhile are dropped
//!
//! `FrameStreamer::send` never awaits, so the capture thread does not need
//! a tokio runtime.

pub mod connection;
pub mod control;
pub mod diagnostic;
pub mod error;
pub mod metrics;
pub mod streamer;
pub mod wire;

pub use connection::{ConnectionManager, ConnectionState, WritePermit, WriteRefused};
pub use control::StreamingControl;
pub use diagnostic::{format_diagnostic, SampleInterval};
pub use error::StreamerError;
pub use metrics::{StreamerMetrics, StreamerMetricsSnapshot};
pub use streamer::{FrameStreamer, SendOutcome};
pub use wire::{decode_frame, encode_frame, WireDecoder, WireError, WireMessage, MAX_TEXT_LEN};
