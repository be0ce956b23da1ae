//! CLI parse: clap types for Treatise. No behavior; definitions only.

use crate::document::StructureMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Treatise CLI - long-form document generation
#[derive(Parser)]
#[command(name = "treatise")]
#[command(about = "Generate long-form research documents with language-model backends")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a document for a topic, streaming progress
    Generate {
        /// Research subject
        topic: String,
        /// Model identifier (defaults to the provider's default model)
        #[arg(long)]
        model: Option<String>,
        /// Structure mode (automatic or manual)
        #[arg(long, default_value = "automatic")]
        structure: StructureMode,
        /// Exact number of chapters
        #[arg(long)]
        chapters: Option<usize>,
        /// Target total word count
        #[arg(long)]
        words: Option<usize>,
        /// Append a references section
        #[arg(long)]
        references: bool,
        /// Citation style for references (default: APA)
        #[arg(long)]
        citation_style: Option<String>,
        /// Output directory (overrides configuration)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List the active provider's models, preferred first
    Models {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Command name string for logging (e.g. "generate", "models").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::Models { .. } => "models",
    }
}
