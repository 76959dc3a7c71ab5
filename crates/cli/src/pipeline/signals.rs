//! Process signals driving a stream session
//!
//! - Ctrl+C / SIGTERM: stop
//! - SIGUSR1: toggle streaming

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::warn;

use crate::error::CliError;

/// Ctrl+C / SIGTERM listener
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignal {
    /// Install handlers; must be called inside the runtime
    pub fn install() -> Result<Self, CliError> {
        #[cfg(unix)]
        {
            let terminate = signal(SignalKind::terminate())
                .map_err(|e| CliError::signal("SIGTERM", e))?;
            Ok(Self { terminate })
        }

        #[cfg(not(unix))]
        Ok(Self {})
    }

    /// Resolves on the first Ctrl+C or SIGTERM
    pub async fn wait(self) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Ctrl+C handler failed");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let mut sigterm = self.terminate;
        #[cfg(unix)]
        let terminate = async {
            if sigterm.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
    }
}

/// SIGUSR1 listener
pub struct ToggleSignal {
    #[cfg(unix)]
    usr1: Signal,
}

impl ToggleSignal {
    pub fn install() -> Result<Self, CliError> {
        #[cfg(unix)]
        {
            let usr1 = signal(SignalKind::user_defined1())
                .map_err(|e| CliError::signal("SIGUSR1", e))?;
            Ok(Self { usr1 })
        }

        #[cfg(not(unix))]
        Ok(Self {})
    }

    /// Resolves on every SIGUSR1; never resolves off unix
    pub async fn recv(&mut self) {
        #[cfg(unix)]
        if self.usr1.recv().await.is_some() {
            return;
        }
        std::future::pending::<()>().await;
    }
}
