//! Environment source: TREATISE__SECTION__KEY plus the single-key TREATISE_PROVIDER.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub const PREFIX: &str = "TREATISE";
pub const PROVIDER_VAR: &str = "TREATISE_PROVIDER";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .add_source(
            Environment::with_prefix(PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("provider", std::env::var(PROVIDER_VAR).ok())
}
