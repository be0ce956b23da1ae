//! Merge rules: built-in defaults sit below every file and environment source.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider", "gateway")?
        .set_default("retry.max_retries", 3)?
        .set_default("retry.initial_delay_ms", 1000)?
        .set_default("retry.backoff_factor", 2.0)?
        .set_default("retry.max_jitter_ms", 500)?
        .set_default("output.dir", "output")?
        .set_default("output.reference_doc", "reference.docx")?
        .set_default("output.converter", "pandoc")?
        .set_default("output.conversion_timeout_secs", 60)
}
