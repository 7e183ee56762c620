//! # Adaptive Cover
//!
//! Positioning engine for window coverings. For a group of covers sharing one window
//! orientation it computes where vertical blinds, awnings and venetian slats should
//! stand so direct sunlight stops at a chosen distance from the window, optionally
//! overridden by a climate strategy, and decides when a device may actually be
//! commanded.
//!
//! ## Architecture
//!
//! - **Geometry**: `calculation` holds the sun-versus-window model, the three cover
//!   shapes, position limits and the climate decision tree
//! - **Sun provider**: `sun` computes positions, sunrise/sunset and day samples
//! - **Policy**: `policy` turns one sun sample and the climate inputs into a
//!   [`policy::CoverState`], including output interpolation and inversion
//! - **Manual override**: `manager` detects and expires manual control per cover
//! - **Coordinator**: `coordinator` owns a group's runtime state, gates every
//!   command and drives the event loop against a [`host::HostRuntime`]
//! - **Configuration**: `config` loads and validates the TOML description of a group
//! - **Commands**: `commands` implements the `check` and `simulate` CLI commands
//! - **Infrastructure**: logging, the clock abstraction and shared constants

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod calculation;
pub mod commands;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod host;
pub mod manager;
pub mod policy;
pub mod sun;
pub mod time_source;
pub mod toggles;

pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorEvent, CoordinatorParams, EventLoop};
pub use host::HostRuntime;
