//! Position policy: from sun and climate inputs to the one position sent to devices.
//!
//! The policy picks the climate position when climate mode is on and the geometric
//! position otherwise, then maps the result onto the range the device honors. Two
//! output transforms exist and they are mutually exclusive:
//!
//! - Interpolation remaps 0-100 onto `[start, end]` or onto a list of breakpoints,
//!   snapping the mapped endpoints back to fully closed and fully open.
//! - Inversion replaces `p` with `100 - p` for devices that count the other way.
//!
//! With both enabled, interpolation wins and inversion is skipped with a warning.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::calculation::{
    ClimateCoverData, ClimateCoverState, ClimateReadings, ClimateSummary, CoverModel, CoverShape,
    DayDefaults, NormalCoverState, PositionLimits, SunGeometry, VisibilityWindow, WindowGeometry,
};
use crate::config::Config;
use crate::sun::{SolarSample, SunTimes};
use crate::toggles::RuntimeToggles;

/// Which branch of the policy produced the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMethod {
    /// Climate mode off: geometry alone.
    Normal,
    Summer,
    Winter,
    /// Climate mode on, temperature between the thresholds.
    Intermediate,
}

impl ControlMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMethod::Normal => "normal",
            ControlMethod::Summer => "summer",
            ControlMethod::Winter => "winter",
            ControlMethod::Intermediate => "intermediate",
        }
    }
}

/// Output of one policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverState {
    /// Geometric position, before output transforms.
    pub default_position: u8,
    /// Climate position, before output transforms. `None` without a temperature entity.
    pub climate_position: Option<u8>,
    /// Position commanded to the devices.
    pub final_position: u8,
    pub sun_valid: bool,
    pub blind_spot_active: bool,
    pub visibility_window: VisibilityWindow,
    pub control_method: ControlMethod,
    pub sun: SolarSample,
    pub climate: Option<ClimateSummary>,
}

/// Everything that changes between two evaluations.
pub struct PolicyInputs<'a> {
    pub sample: SolarSample,
    pub sun_times: SunTimes,
    pub visibility: VisibilityWindow,
    pub readings: &'a ClimateReadings,
    pub toggles: &'a RuntimeToggles,
    pub now: DateTime<Utc>,
}

pub struct PositionPolicy<'a> {
    config: &'a Config,
}

impl<'a> PositionPolicy<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Cover model of the configured shape for one sun sample.
    pub fn cover_model(
        &self,
        sample: SolarSample,
        sun_times: SunTimes,
        now: DateTime<Utc>,
    ) -> CoverModel {
        let sun = SunGeometry::new(
            sample,
            WindowGeometry::from_config(self.config),
            DayDefaults::from_config(self.config),
            sun_times,
            now,
        );
        CoverModel::new(
            sun,
            CoverShape::from_config(self.config),
            PositionLimits::from_config(self.config),
        )
    }

    pub fn evaluate(&self, inputs: PolicyInputs<'_>) -> CoverState {
        let model = self.cover_model(inputs.sample, inputs.sun_times, inputs.now);
        let default_position = to_position(NormalCoverState::new(&model).get_state());

        let climate_active = inputs.toggles.climate_mode() && self.config.climate_configured();
        let mut control_method = ControlMethod::Normal;
        let mut climate_position = None;
        let mut climate = None;

        if self.config.climate_configured() {
            let data = ClimateCoverData::new(
                inputs.readings,
                &self.config.climate,
                inputs.toggles.climate_switches(),
            );
            let summary = data.summary();
            climate_position = Some(to_position(ClimateCoverState::new(&model, data).get_state()));

            if climate_active {
                control_method = if summary.is_winter {
                    ControlMethod::Winter
                } else if summary.is_summer {
                    ControlMethod::Summer
                } else {
                    ControlMethod::Intermediate
                };
            }
            climate = Some(summary);
        }

        let state = match climate_position {
            Some(position) if climate_active => position,
            _ => default_position,
        };

        CoverState {
            default_position,
            climate_position,
            final_position: to_position(self.transform(f64::from(state))),
            sun_valid: model.sun.valid(),
            blind_spot_active: model.sun.is_sun_in_blind_spot(),
            visibility_window: inputs.visibility,
            control_method,
            sun: inputs.sample,
            climate,
        }
    }

    /// Apply the configured output transforms to a 0-100 position.
    pub fn transform(&self, state: f64) -> f64 {
        let mut state = state;
        if self.config.interpolation.enabled {
            state = self.interpolate(state);
        }
        if self.config.window.inverse_state {
            if self.config.interpolation.enabled {
                log_warning!("Inverse state is ignored while interpolation is enabled");
            } else {
                state = 100.0 - state;
            }
        }
        state
    }

    /// Remap a position onto the configured range.
    ///
    /// Breakpoint lists take precedence over start/end. A result equal to the first
    /// mapped value becomes 0 and one equal to the last becomes 100.
    pub fn interpolate(&self, state: f64) -> f64 {
        let settings = &self.config.interpolation;
        let (old, new): (Vec<f64>, Vec<f64>) =
            if !settings.list.is_empty() && !settings.list_new.is_empty() {
                (settings.list.clone(), settings.list_new.clone())
            } else if let (Some(start), Some(end)) = (settings.start, settings.end) {
                (vec![0.0, 100.0], vec![start, end])
            } else {
                return state;
            };

        let mapped = interp(state, &old, &new);
        if new.first() == Some(&mapped) {
            0.0
        } else if new.last() == Some(&mapped) {
            100.0
        } else {
            mapped
        }
    }

    /// Transformed sunset position, the target of the return-to-sunset timer.
    pub fn sunset_target(&self) -> u8 {
        to_position(self.transform(self.config.window.sunset_position))
    }

    /// Targets that are always commanded regardless of the minimum change.
    pub fn is_special_position(&self, position: u8) -> bool {
        position == 0
            || position == 100
            || position == to_position(self.transform(self.config.window.default_percentage))
            || position == self.sunset_target()
    }
}

/// Piecewise-linear interpolation of `x` over `(xp, fp)`, constant outside the range.
///
/// `xp` must be increasing and as long as `fp`; configuration validation ensures both.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let (Some(&x_first), Some(&x_last)) = (xp.first(), xp.last()) else {
        return x;
    };
    if x <= x_first {
        return fp[0];
    }
    if x >= x_last {
        return fp[fp.len() - 1];
    }

    for (i, pair) in xp.windows(2).enumerate() {
        let (x0, x1) = (pair[0], pair[1]);
        if x <= x1 {
            let (y0, y1) = (fp[i], fp[i + 1]);
            return y0 + (x - x0) * (y1 - y0) / (x1 - x0);
        }
    }
    fp[fp.len() - 1]
}

/// Round and clip a percentage into a device position.
pub fn to_position(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}
