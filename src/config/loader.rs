//! Assembles the configuration sources in precedence order and deserializes them.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::AppConfig;
use crate::error::ApiError;
use config::File;
use std::path::PathBuf;
use tracing::debug;

pub struct ConfigLoader {
    workspace_root: PathBuf,
    explicit_file: Option<PathBuf>,
    global_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            explicit_file: None,
            global_file: global_file::global_config_path(),
        }
    }

    /// Use one explicit file instead of the global and workspace files
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_file = path;
        self
    }

    /// Override where the global file is looked up (`None` disables it)
    pub fn with_global_file(mut self, path: Option<PathBuf>) -> Self {
        self.global_file = path;
        self
    }

    /// Merge all sources, deserialize, and validate
    pub fn build(&self) -> Result<AppConfig, ApiError> {
        let mut builder = merge_policy::builder_with_defaults()?;

        match &self.explicit_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ApiError::ConfigError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                debug!(config_path = %path.display(), "Using explicit config file");
                builder = builder.add_source(File::from(path.clone()).required(true));
            }
            None => {
                builder = global_file::add_to_builder(builder, self.global_file.as_deref());
                builder = workspace_file::add_to_builder(builder, &self.workspace_root);
            }
        }

        builder = environment::add_to_builder(builder)?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.ensure_valid()?;
        Ok(config)
    }
}
