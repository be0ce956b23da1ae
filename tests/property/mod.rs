//! Property-based tests for planning and progress invariants

mod outline;
mod progress;
