//! Streaming on/off switch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Shared streaming-enabled flag
///
/// Starts enabled and is re-enabled on every accepted connection. Toggling
/// never touches the connection itself.
#[derive(Debug, Clone)]
pub struct StreamingControl {
    enabled: Arc<AtomicBool>,
}

impl Default for StreamingControl {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StreamingControl {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Negate the flag
    pub fn toggle(&self) {
        let enabled = !self.enabled.fetch_xor(true, Ordering::AcqRel);
        info!(enabled, "streaming toggled");
        observability::record_streaming_state(enabled);
    }

    pub(crate) fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
        observability::record_streaming_state(true);
    }
}
