//! CLI domain: parse, route, output, and presentation only.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{map_error, RunOutcome};
pub use parse::{command_name, Cli, Commands};
pub use presentation::{format_event_json, format_models_json, format_models_text, TextRenderer};
pub use route::RunContext;
