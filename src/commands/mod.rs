//! Command-line command handlers for earthpaper.
//!
//! Each one-shot command lives in its own submodule and returns the process
//! exit code; `main` only dispatches.

pub mod fetch;
pub mod help;
pub mod prepare_night;
pub mod render;
pub mod status;
