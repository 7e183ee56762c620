//! Sun-to-window geometry shared by every cover shape.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::constants::MAX_EFFECTIVE_FOV;
use crate::sun::{SolarSample, SunTimes};

/// Sub-arc of the field of view, as angles from the left field-of-view edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlindSpot {
    pub left: f64,
    pub right: f64,
    pub elevation: Option<f64>,
}

/// Orientation and admissibility band of a window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGeometry {
    pub azimuth: f64,
    pub fov_left: f64,
    pub fov_right: f64,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub blind_spot: Option<BlindSpot>,
}

impl WindowGeometry {
    pub fn from_config(config: &Config) -> Self {
        let blind_spot = match (
            config.blind_spot.enabled,
            config.blind_spot.left,
            config.blind_spot.right,
        ) {
            (true, Some(left), Some(right)) => Some(BlindSpot {
                left,
                right,
                elevation: config.blind_spot.elevation,
            }),
            _ => None,
        };

        Self {
            azimuth: config.window.azimuth,
            fov_left: config.window.fov_left,
            fov_right: config.window.fov_right,
            min_elevation: config.window.min_elevation,
            max_elevation: config.window.max_elevation,
            blind_spot,
        }
    }

    /// Absolute compass bearing of the left edge of the band.
    pub fn azi_min_abs(&self) -> f64 {
        (self.azimuth - self.fov_left + 360.0).rem_euclid(360.0)
    }

    /// Absolute compass bearing of the right edge of the band.
    pub fn azi_max_abs(&self) -> f64 {
        (self.azimuth + self.fov_right + 360.0).rem_euclid(360.0)
    }

    /// Whether `azimuth` lies in `[azi_min_abs, azi_max_abs)`, wrapping at north.
    pub fn azimuth_in_band(&self, azimuth: f64) -> bool {
        let min = self.azi_min_abs();
        let width = (self.azi_max_abs() - min).rem_euclid(360.0);
        (azimuth - min).rem_euclid(360.0) < width
    }
}

/// Positions used when the sun does not shine through the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayDefaults {
    pub default_percentage: f64,
    pub sunset_position: f64,
    pub sunset_offset: Duration,
    pub sunrise_offset: Duration,
}

impl DayDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_percentage: config.window.default_percentage,
            sunset_position: config.window.sunset_position,
            sunset_offset: Duration::minutes(config.window.sunset_offset),
            sunrise_offset: Duration::minutes(config.window.sunrise_offset),
        }
    }
}

/// Relation between the sun and one window at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SunGeometry {
    pub sample: SolarSample,
    pub window: WindowGeometry,
    pub defaults: DayDefaults,
    pub sun_times: SunTimes,
    pub now: DateTime<Utc>,
}

impl SunGeometry {
    pub fn new(
        sample: SolarSample,
        window: WindowGeometry,
        defaults: DayDefaults,
        sun_times: SunTimes,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            sample,
            window,
            defaults,
            sun_times,
            now,
        }
    }

    /// Signed sun azimuth relative to the window normal, in `[-180, 180)`.
    /// Positive values are left of the boresight.
    pub fn gamma(&self) -> f64 {
        (self.window.azimuth - self.sample.azimuth + 180.0).rem_euclid(360.0) - 180.0
    }

    pub fn valid_elevation(&self) -> bool {
        let elevation = self.sample.elevation;
        match (self.window.min_elevation, self.window.max_elevation) {
            (None, None) => elevation >= 0.0,
            (Some(min), None) => elevation >= min,
            (None, Some(max)) => elevation <= max,
            (Some(min), Some(max)) => (min..=max).contains(&elevation),
        }
    }

    /// Sun is in front of the window and within the elevation band.
    pub fn valid(&self) -> bool {
        let gamma = self.gamma();
        gamma < self.window.fov_left.min(MAX_EFFECTIVE_FOV)
            && gamma > -self.window.fov_right.min(MAX_EFFECTIVE_FOV)
            && self.valid_elevation()
    }

    pub fn is_sun_in_blind_spot(&self) -> bool {
        let Some(blind_spot) = self.window.blind_spot else {
            return false;
        };

        let left_edge = self.window.fov_left - blind_spot.left;
        let right_edge = self.window.fov_left - blind_spot.right;
        let gamma = self.gamma();
        let in_arc = gamma <= left_edge && gamma >= right_edge;

        match blind_spot.elevation {
            Some(ceiling) => in_arc && self.sample.elevation <= ceiling,
            None => in_arc,
        }
    }

    /// Night: after sunset plus offset, or before sunrise plus offset.
    pub fn sunset_valid(&self) -> bool {
        let after_sunset = self.now > self.sun_times.sunset + self.defaults.sunset_offset;
        let before_sunrise = self.now < self.sun_times.sunrise + self.defaults.sunrise_offset;
        after_sunset || before_sunrise
    }

    pub fn direct_sun_valid(&self) -> bool {
        self.valid() && !self.sunset_valid() && !self.is_sun_in_blind_spot()
    }

    /// Position used whenever the computed one does not apply.
    pub fn default(&self) -> f64 {
        if self.sunset_valid() {
            self.defaults.sunset_position
        } else {
            self.defaults.default_percentage
        }
    }
}

/// First and last moment of a day the sun is in front of the window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VisibilityWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Scan a day of samples for the visibility window of `window`.
pub fn solar_times(
    window: &WindowGeometry,
    samples: &[(DateTime<Utc>, SolarSample)],
) -> VisibilityWindow {
    let mut visible = samples
        .iter()
        .filter(|(_, sample)| window.azimuth_in_band(sample.azimuth) && sample.elevation > 0.0)
        .map(|(instant, _)| *instant);

    let start = visible.next();
    let end = visible.last().or(start);
    VisibilityWindow { start, end }
}
