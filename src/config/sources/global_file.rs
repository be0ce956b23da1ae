//! Global config file source: $XDG_CONFIG_HOME/treatise/config.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path to the global config file, if a home directory can be resolved.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("treatise").join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>, path: Option<&Path>) -> ConfigBuilder<DefaultState> {
    match path {
        Some(path) if path.exists() => {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            builder.add_source(File::from(canonical).required(false))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            builder
        }
        None => builder,
    }
}
