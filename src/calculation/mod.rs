//! Cover position calculation.
//!
//! - `geometry`: where the sun is relative to the window and whether it counts
//! - `shape`: per-shape conversion of that geometry into a position
//! - `state`: the geometric state with default-at-night and min/max clamps
//! - `climate`: the comfort overlay layered over the geometric state

pub mod climate;
pub mod geometry;
pub mod shape;
pub mod state;

pub use climate::{
    ClimateCoverData, ClimateCoverState, ClimateReadings, ClimateSummary, ClimateSwitches,
    PresenceReading,
};
pub use geometry::{BlindSpot, DayDefaults, SunGeometry, VisibilityWindow, WindowGeometry, solar_times};
pub use shape::{Awning, CoverShape, Tilt, Vertical};
pub use state::{CoverModel, NormalCoverState, PositionLimits};

#[cfg(test)]
mod tests;
