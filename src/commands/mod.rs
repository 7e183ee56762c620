//! Command-line command handlers for adaptive-cover.
//!
//! Each command lives in its own submodule with a `handle_*_command` entry point and
//! a `display_help` function used by `adaptive-cover help <command>`.

pub mod check;
pub mod help;
pub mod simulate;

pub use simulate::SimulatedHost;
