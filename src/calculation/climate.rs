//! Climate overlay on top of the geometric position.
//!
//! The readings come from the host each refresh and any of them may be missing.
//! A missing presence reading counts as occupied, a missing weather entity counts as
//! sunny, and a missing temperature disables the summer/winter branches, so the
//! overlay falls back to the geometric baseline.

use serde::Serialize;

use crate::config::{ClimateConfig, TiltMode};
use crate::constants::{TILT_CLOSED_BI_ANGLE, TILT_GLARE_ANGLE, TILT_NEUTRAL_ANGLE};

use super::shape::{CoverShape, Tilt};
use super::state::{CoverModel, NormalCoverState};

/// State of the presence entity together with its domain.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceReading {
    pub domain: String,
    pub state: String,
}

/// Raw signals read from the host for one refresh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClimateReadings {
    pub inside_temperature: Option<f64>,
    pub outside_temperature: Option<f64>,
    pub presence: Option<PresenceReading>,
    pub weather_state: Option<String>,
    pub lux: Option<f64>,
    pub irradiance: Option<f64>,
}

/// Runtime switches that shape the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClimateSwitches {
    pub prefer_outside_temp: bool,
    pub lux_enabled: bool,
    pub irradiance_enabled: bool,
}

/// Climate predicates derived from readings and thresholds.
#[derive(Debug, Clone)]
pub struct ClimateCoverData<'a> {
    pub readings: &'a ClimateReadings,
    pub settings: &'a ClimateConfig,
    pub switches: ClimateSwitches,
}

impl<'a> ClimateCoverData<'a> {
    pub fn new(
        readings: &'a ClimateReadings,
        settings: &'a ClimateConfig,
        switches: ClimateSwitches,
    ) -> Self {
        Self {
            readings,
            settings,
            switches,
        }
    }

    /// Outside temperature when preferred and available, otherwise inside.
    pub fn current_temperature(&self) -> Option<f64> {
        if self.switches.prefer_outside_temp
            && let Some(outside) = self.readings.outside_temperature
        {
            return Some(outside);
        }
        self.readings.inside_temperature
    }

    pub fn is_winter(&self) -> bool {
        self.current_temperature()
            .is_some_and(|temp| temp < self.settings.temp_low)
    }

    /// Outside temperature is above the summer threshold, true when either is unknown.
    pub fn outside_high(&self) -> bool {
        match (self.settings.outside_threshold, self.readings.outside_temperature) {
            (Some(threshold), Some(outside)) => outside > threshold,
            _ => true,
        }
    }

    pub fn is_summer(&self) -> bool {
        self.current_temperature()
            .is_some_and(|temp| temp > self.settings.temp_high)
            && self.outside_high()
    }

    pub fn is_sunny(&self) -> bool {
        if self.settings.weather_entity.is_none() {
            return true;
        }
        self.readings.weather_state.as_ref().is_some_and(|state| {
            self.settings
                .weather_conditions
                .iter()
                .any(|allowed| allowed == state)
        })
    }

    pub fn is_presence(&self) -> bool {
        let Some(presence) = &self.readings.presence else {
            return true;
        };

        match presence.domain.as_str() {
            "device_tracker" => presence.state == "home",
            "zone" => presence
                .state
                .parse::<f64>()
                .map(|count| count > 0.0)
                .unwrap_or(false),
            "binary_sensor" | "input_boolean" => presence.state == "on",
            _ => true,
        }
    }

    /// Illuminance is at or below the threshold: not bright enough to need shade.
    pub fn lux(&self) -> bool {
        self.switches.lux_enabled
            && self.settings.lux_entity.is_some()
            && self
                .readings
                .lux
                .is_some_and(|value| value <= self.settings.lux_threshold)
    }

    pub fn irradiance(&self) -> bool {
        self.switches.irradiance_enabled
            && self.settings.irradiance_entity.is_some()
            && self
                .readings
                .irradiance
                .is_some_and(|value| value <= self.settings.irradiance_threshold)
    }

    pub fn summary(&self) -> ClimateSummary {
        ClimateSummary {
            current_temperature: self.current_temperature(),
            outside_temperature: self.readings.outside_temperature,
            is_presence: self.is_presence(),
            is_summer: self.is_summer(),
            is_winter: self.is_winter(),
            is_sunny: self.is_sunny(),
            lux_active: self.lux(),
            irradiance_active: self.irradiance(),
        }
    }
}

/// Snapshot of the climate predicates exposed next to the cover state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClimateSummary {
    pub current_temperature: Option<f64>,
    pub outside_temperature: Option<f64>,
    pub is_presence: bool,
    pub is_summer: bool,
    pub is_winter: bool,
    pub is_sunny: bool,
    pub lux_active: bool,
    pub irradiance_active: bool,
}

/// Position from geometry adjusted for comfort and energy.
pub struct ClimateCoverState<'a> {
    pub cover: &'a CoverModel,
    pub climate: ClimateCoverData<'a>,
}

impl<'a> ClimateCoverState<'a> {
    pub fn new(cover: &'a CoverModel, climate: ClimateCoverData<'a>) -> Self {
        Self { cover, climate }
    }

    fn geometric(&self) -> f64 {
        NormalCoverState::new(self.cover).get_state()
    }

    /// Decision tree for vertical blinds and awnings.
    pub fn normal_type_cover(&self) -> f64 {
        if self.climate.is_presence() {
            self.normal_with_presence()
        } else {
            self.normal_without_presence()
        }
    }

    fn normal_with_presence(&self) -> f64 {
        let is_summer = self.climate.is_summer();

        // Glare and daylight checks take precedence over temperature
        if !is_summer
            && (self.climate.lux() || self.climate.irradiance() || !self.climate.is_sunny())
        {
            if self.climate.is_winter() && self.cover.sun.valid() {
                return 100.0;
            }
            return self.cover.sun.default();
        }

        if is_summer && self.climate.settings.transparent_blind {
            return 0.0;
        }

        self.geometric()
    }

    fn normal_without_presence(&self) -> f64 {
        if self.cover.sun.valid() {
            if self.climate.is_summer() {
                return 0.0;
            }
            if self.climate.is_winter() {
                return 100.0;
            }
        }
        self.cover.sun.default()
    }

    /// Decision tree for venetian blinds. Only applies while the sun is up and a
    /// temperature is known.
    pub fn tilt_state(&self, tilt: &Tilt) -> f64 {
        if self.climate.current_temperature().is_none() || self.cover.sun.sample.elevation <= 0.0 {
            return self.geometric();
        }

        let degrees = tilt.mode.degrees();
        if self.climate.is_presence() {
            if self.climate.is_winter() && self.climate.is_sunny() {
                return self.geometric();
            }
            if self.climate.is_summer() {
                return TILT_GLARE_ANGLE / degrees * 100.0;
            }
            if self.cover.sun.valid() && self.climate.is_sunny() {
                return self.geometric();
            }
            return TILT_NEUTRAL_ANGLE / degrees * 100.0;
        }

        if self.climate.is_winter() {
            return match tilt.mode {
                TiltMode::Single => 100.0,
                // Slats parallel to the sun rays
                TiltMode::Bidirectional if self.cover.sun.valid() => {
                    let sun = &self.cover.sun;
                    let beta = Tilt::beta(sun.gamma(), sun.sample.elevation).to_degrees();
                    (beta + 90.0) / degrees * 100.0
                }
                TiltMode::Bidirectional => TILT_CLOSED_BI_ANGLE / degrees * 100.0,
            };
        }
        if self.climate.is_summer() {
            return 0.0;
        }
        TILT_NEUTRAL_ANGLE / degrees * 100.0
    }

    pub fn get_state(&self) -> f64 {
        let result = match &self.cover.shape {
            CoverShape::Tilt(tilt) => self.tilt_state(tilt),
            CoverShape::Vertical(_) | CoverShape::Awning(_) => self.normal_type_cover(),
        };
        self.cover
            .limits
            .apply(result, self.cover.sun.direct_sun_valid())
    }
}
