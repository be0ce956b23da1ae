//! Treatise: Long-Form Document Generation
//!
//! Plans a document for a topic, generates each section through a pluggable
//! language-model backend with retry and model fallback, assembles the result as
//! markdown and converts it to a word-processor format, streaming progress events
//! throughout.

pub mod cli;
pub mod config;
pub mod converter;
pub mod document;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod retry;
pub mod router;
pub mod task;

pub use error::ApiError;
pub use orchestrator::{GenerationRequest, GenerationRun, Orchestrator};
