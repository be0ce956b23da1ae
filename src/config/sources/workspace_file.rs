//! Workspace config files under `<root>/config/`

use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Selects the environment overlay, `config/{TREATISE_ENV}.toml`
pub const ENV_VAR: &str = "TREATISE_ENV";
const DEFAULT_ENV: &str = "development";

/// Base file first, then the environment overlay; missing files are skipped.
pub fn candidate_paths(workspace_root: &Path) -> [PathBuf; 2] {
    let config_dir = workspace_root.join("config");
    let env_name = std::env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENV.to_string());
    [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ]
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    candidate_paths(workspace_root)
        .into_iter()
        .filter(|path| path.exists())
        .fold(builder, |builder, path| {
            debug!(path = %path.display(), "Adding workspace config file");
            builder.add_source(File::from(path).format(FileFormat::Toml).required(false))
        })
}
