//! Command implementations.

mod info;
mod run;
mod validate;
mod watch;

pub use info::run_info;
pub use run::run_stream;
pub use validate::run_validate;
pub use watch::run_watch;

use std::path::Path;

use contracts::StreamerConfig;

use crate::error::CliError;

/// Load and validate a configuration file
fn load_config(path: &Path) -> Result<StreamerConfig, CliError> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    config_loader::ConfigLoader::load_from_path(path)
        .map_err(|e| CliError::invalid_config(path.display().to_string(), e))
}
