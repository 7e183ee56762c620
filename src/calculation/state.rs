//! Geometric cover state with min/max clamps.

use crate::config::Config;

use super::geometry::SunGeometry;
use super::shape::CoverShape;

/// Configured position ceiling and floor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionLimits {
    pub max_position: Option<f64>,
    pub max_sun_only: bool,
    pub min_position: Option<f64>,
    pub min_sun_only: bool,
}

impl PositionLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_position: config.window.max_position,
            max_sun_only: config.window.max_position_sun_only,
            min_position: config.window.min_position,
            min_sun_only: config.window.min_position_sun_only,
        }
    }

    fn active_max(&self, direct_sun_valid: bool) -> Option<f64> {
        self.max_position
            .filter(|max| *max != 100.0)
            .filter(|_| !self.max_sun_only || direct_sun_valid)
    }

    fn active_min(&self, direct_sun_valid: bool) -> Option<f64> {
        self.min_position
            .filter(|min| *min != 0.0)
            .filter(|_| !self.min_sun_only || direct_sun_valid)
    }

    /// Apply the ceiling first, then the floor.
    pub fn apply(&self, value: f64, direct_sun_valid: bool) -> f64 {
        if let Some(max) = self.active_max(direct_sun_valid)
            && value > max
        {
            return max;
        }
        if let Some(min) = self.active_min(direct_sun_valid)
            && value < min
        {
            return min;
        }
        value
    }
}

/// One cover shape evaluated against the current sun geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverModel {
    pub sun: SunGeometry,
    pub shape: CoverShape,
    pub limits: PositionLimits,
}

impl CoverModel {
    pub fn new(sun: SunGeometry, shape: CoverShape, limits: PositionLimits) -> Self {
        Self { sun, shape, limits }
    }

    pub fn calculate_position(&self) -> f64 {
        self.shape.position(&self.sun)
    }

    pub fn calculate_percentage(&self) -> f64 {
        self.shape.percentage(&self.sun)
    }
}

/// Position from geometry alone.
pub struct NormalCoverState<'a> {
    pub cover: &'a CoverModel,
}

impl<'a> NormalCoverState<'a> {
    pub fn new(cover: &'a CoverModel) -> Self {
        Self { cover }
    }

    pub fn get_state(&self) -> f64 {
        let direct_sun_valid = self.cover.sun.direct_sun_valid();
        let state = if direct_sun_valid {
            self.cover.calculate_percentage()
        } else {
            self.cover.sun.default()
        };
        self.cover
            .limits
            .apply(state.clamp(0.0, 100.0), direct_sun_valid)
    }
}
