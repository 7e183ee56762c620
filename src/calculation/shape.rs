//! Per-shape position models.
//!
//! Each shape converts the sun geometry into a physical quantity (blind height,
//! awning extension, slat angle) and then into a 0-100 percentage. The awning is a
//! vertical blind seen from the side, so it holds a [`Vertical`] and triangulates
//! from the shade height that one produces.

use crate::config::{Config, CoverType, TiltMode};

use super::geometry::SunGeometry;

/// Roller blind lowered from the top of the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertical {
    /// Meters of floor from the window that should stay in shade.
    pub distance: f64,
    pub window_height: f64,
}

impl Vertical {
    /// Blind height in meters.
    pub fn height(&self, gamma: f64, elevation: f64) -> f64 {
        let raw = (self.distance / gamma.to_radians().cos()) * elevation.to_radians().tan();
        raw.clamp(0.0, self.window_height)
    }

    pub fn percentage(&self, gamma: f64, elevation: f64) -> f64 {
        (self.height(gamma, elevation) / self.window_height * 100.0).round()
    }
}

/// Awning mounted above the window at an angle from the horizontal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Awning {
    pub vertical: Vertical,
    pub length: f64,
    pub angle: f64,
}

impl Awning {
    /// Extension length in meters, by the law of sines on the shade triangle.
    pub fn extension(&self, gamma: f64, elevation: f64) -> f64 {
        let awning_angle = 90.0 - self.angle;
        let a_angle = 90.0 - elevation;
        let c_angle = 180.0 - awning_angle - a_angle;

        let uncovered = self.vertical.window_height - self.vertical.height(gamma, elevation);
        (uncovered * a_angle.to_radians().sin()) / c_angle.to_radians().sin()
    }

    pub fn percentage(&self, gamma: f64, elevation: f64) -> f64 {
        (self.extension(gamma, elevation) / self.length * 100.0).round()
    }
}

/// Venetian blind with tiltable slats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tilt {
    pub slat_distance: f64,
    pub slat_depth: f64,
    pub mode: TiltMode,
}

impl Tilt {
    /// Profile angle of the sun in radians.
    pub fn beta(gamma: f64, elevation: f64) -> f64 {
        (elevation.to_radians().tan() / gamma.to_radians().cos()).atan()
    }

    /// Slat angle in degrees that just blocks direct sun (Basurto et al., 2020).
    pub fn slat_angle(&self, gamma: f64, elevation: f64) -> f64 {
        let beta = Self::beta(gamma, elevation);
        let ratio = self.slat_distance / self.slat_depth;
        // Slats spaced wider than they are deep cannot block a low sun completely
        let discriminant = (beta.tan().powi(2) - ratio.powi(2) + 1.0).max(0.0);
        let slat = 2.0 * ((beta.tan() + discriminant.sqrt()) / (1.0 + ratio)).atan();
        slat.to_degrees()
    }

    pub fn percentage(&self, gamma: f64, elevation: f64) -> f64 {
        (self.slat_angle(gamma, elevation) / self.mode.degrees() * 100.0).round()
    }
}

/// The closed set of supported cover shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverShape {
    Vertical(Vertical),
    Awning(Awning),
    Tilt(Tilt),
}

impl CoverShape {
    pub fn from_config(config: &Config) -> Self {
        let vertical = Vertical {
            distance: config.vertical.distance,
            window_height: config.vertical.window_height,
        };

        match config.cover_type {
            CoverType::Vertical => CoverShape::Vertical(vertical),
            CoverType::Awning => CoverShape::Awning(Awning {
                vertical,
                length: config.awning.length,
                angle: config.awning.angle,
            }),
            CoverType::Tilt => CoverShape::Tilt(Tilt {
                slat_distance: config.tilt.slat_distance,
                slat_depth: config.tilt.slat_depth,
                mode: config.tilt.mode,
            }),
        }
    }

    /// Physical quantity: meters for vertical and awning covers, degrees for slats.
    pub fn position(&self, sun: &SunGeometry) -> f64 {
        let (gamma, elevation) = (sun.gamma(), sun.sample.elevation);
        match self {
            CoverShape::Vertical(vertical) => vertical.height(gamma, elevation),
            CoverShape::Awning(awning) => awning.extension(gamma, elevation),
            CoverShape::Tilt(tilt) => tilt.slat_angle(gamma, elevation),
        }
    }

    /// Position normalized to 0-100 and rounded. May exceed the range for awnings
    /// and slats; callers clip.
    pub fn percentage(&self, sun: &SunGeometry) -> f64 {
        let (gamma, elevation) = (sun.gamma(), sun.sample.elevation);
        match self {
            CoverShape::Vertical(vertical) => vertical.percentage(gamma, elevation),
            CoverShape::Awning(awning) => awning.percentage(gamma, elevation),
            CoverShape::Tilt(tilt) => tilt.percentage(gamma, elevation),
        }
    }
}
