//! Configuration system for a cover group.
//!
//! One TOML file describes one group of covers that share a window orientation:
//! where the window faces, what kind of cover hangs in it, which entities feed the
//! climate overlay, and how aggressively the automation may move the devices.
//!
//! ```toml
//! name = "Living room"
//! cover_type = "vertical"          # "vertical", "awning" or "tilt"
//! entities = ["cover.living_room_left", "cover.living_room_right"]
//!
//! [location]
//! latitude = 52.37
//! longitude = 4.89
//! timezone = "Europe/Amsterdam"
//!
//! [window]
//! azimuth = 200                    # Compass bearing the window faces (0-359)
//! fov_left = 80                    # Degrees left of the boresight considered in front
//! fov_right = 70                   # Degrees right of the boresight considered in front
//! default_percentage = 60          # Position when the sun is not in front
//! sunset_position = 0              # Position after sunset (+ sunset_offset minutes)
//!
//! [vertical]
//! window_height = 2.1              # Meters
//! distance = 0.5                   # Meters of shade wanted from the window
//!
//! [climate]
//! enabled = true
//! temp_entity = "sensor.living_room_temperature"
//! presence_entity = "binary_sensor.living_room_occupied"
//! weather_entity = "weather.home"
//!
//! [automation]
//! delta_position = 2
//! delta_time = 2                   # Minutes between commands per cover
//! end_time = "22:00:00"
//! return_sunset = true
//! ```
//!
//! Every section carries `#[serde(default)]` so the struct handed to the rest of the
//! crate has all defaults resolved. Loading always runs `validate_config`, which
//! rejects impossible geometry before anything is computed.

pub mod loading;
pub mod validation;

use anyhow::Result;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::*;

pub use loading::{get_config_path, load, load_from_path, set_config_dir};

/// Shape of the covers in the group.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoverType {
    /// Roller or vertical blinds lowered from the top of the window.
    #[serde(alias = "cover_blind")]
    Vertical,
    /// Awnings extending outward at a mounting angle.
    #[serde(alias = "cover_awning")]
    Awning,
    /// Venetian blinds whose slats are tilted.
    #[serde(alias = "cover_tilt")]
    Tilt,
}

impl CoverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverType::Vertical => "vertical",
            CoverType::Awning => "awning",
            CoverType::Tilt => "tilt",
        }
    }
}

/// Slat travel of a venetian blind.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TiltMode {
    /// Slats rotate 0-90 degrees.
    #[serde(alias = "mode1")]
    Single,
    /// Slats rotate 0-180 degrees.
    #[serde(alias = "mode2")]
    Bidirectional,
}

impl TiltMode {
    /// Full travel of the slats in degrees.
    pub fn degrees(&self) -> f64 {
        match self {
            TiltMode::Single => 90.0,
            TiltMode::Bidirectional => 180.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level.
    #[serde(default)]
    pub elevation: f64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub azimuth: f64,
    pub fov_left: f64,
    pub fov_right: f64,
    pub default_percentage: f64,
    pub sunset_position: f64,
    /// Minutes after sunset before the sunset position applies.
    pub sunset_offset: i64,
    /// Minutes after sunrise before the daytime default applies.
    pub sunrise_offset: i64,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub max_position: Option<f64>,
    pub max_position_sun_only: bool,
    pub min_position: Option<f64>,
    pub min_position_sun_only: bool,
    pub inverse_state: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            azimuth: DEFAULT_WINDOW_AZIMUTH,
            fov_left: DEFAULT_FOV,
            fov_right: DEFAULT_FOV,
            default_percentage: DEFAULT_PERCENTAGE,
            sunset_position: DEFAULT_SUNSET_POSITION,
            sunset_offset: DEFAULT_SUNSET_OFFSET,
            sunrise_offset: DEFAULT_SUNRISE_OFFSET,
            min_elevation: None,
            max_elevation: None,
            max_position: None,
            max_position_sun_only: false,
            min_position: None,
            min_position_sun_only: false,
            inverse_state: false,
        }
    }
}

/// Sub-arc of the field of view where the sun is ignored, measured from the left edge.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct BlindSpotConfig {
    pub enabled: bool,
    pub left: Option<f64>,
    pub right: Option<f64>,
    /// The blind spot only applies while the sun is at or below this elevation.
    pub elevation: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct VerticalConfig {
    pub window_height: f64,
    pub distance: f64,
}

impl Default for VerticalConfig {
    fn default() -> Self {
        Self {
            window_height: DEFAULT_WINDOW_HEIGHT,
            distance: DEFAULT_DISTANCE,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AwningConfig {
    pub length: f64,
    pub angle: f64,
}

impl Default for AwningConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_AWNING_LENGTH,
            angle: DEFAULT_AWNING_ANGLE,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TiltConfig {
    pub slat_distance: f64,
    pub slat_depth: f64,
    pub mode: TiltMode,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            slat_distance: DEFAULT_SLAT_DISTANCE,
            slat_depth: DEFAULT_SLAT_DEPTH,
            mode: TiltMode::Bidirectional,
        }
    }
}

/// Output remapping onto the range the device actually honors.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct InterpolationConfig {
    pub enabled: bool,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub list: Vec<f64>,
    pub list_new: Vec<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClimateConfig {
    /// Initial state of the climate-mode toggle.
    pub enabled: bool,
    pub temp_entity: Option<String>,
    pub temp_low: f64,
    pub temp_high: f64,
    pub outside_temp_entity: Option<String>,
    pub outside_threshold: Option<f64>,
    /// Initial state of the outside-temperature preference toggle.
    pub prefer_outside_temp: bool,
    pub presence_entity: Option<String>,
    pub weather_entity: Option<String>,
    pub weather_conditions: Vec<String>,
    pub lux_entity: Option<String>,
    pub lux_threshold: f64,
    pub irradiance_entity: Option<String>,
    pub irradiance_threshold: f64,
    pub transparent_blind: bool,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            temp_entity: None,
            temp_low: DEFAULT_TEMP_LOW,
            temp_high: DEFAULT_TEMP_HIGH,
            outside_temp_entity: None,
            outside_threshold: None,
            prefer_outside_temp: false,
            presence_entity: None,
            weather_entity: None,
            weather_conditions: DEFAULT_WEATHER_CONDITIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            lux_entity: None,
            lux_threshold: DEFAULT_LUX_THRESHOLD,
            irradiance_entity: None,
            irradiance_threshold: DEFAULT_IRRADIANCE_THRESHOLD,
            transparent_blind: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AutomationConfig {
    /// Smallest position change worth a command.
    pub delta_position: u8,
    /// Minutes between two commands to the same cover.
    pub delta_time: i64,
    pub start_time: Option<String>,
    pub start_entity: Option<String>,
    pub end_time: Option<String>,
    pub end_entity: Option<String>,
    pub return_sunset: bool,
    /// Minutes a manual override is respected.
    pub manual_override_duration: i64,
    /// Restart the override timer on every further manual change.
    pub manual_override_reset: bool,
    pub manual_threshold: Option<u8>,
    pub manual_ignore_intermediate: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            delta_position: DEFAULT_DELTA_POSITION,
            delta_time: DEFAULT_DELTA_TIME,
            start_time: Some(DEFAULT_START_TIME.to_string()),
            start_entity: None,
            end_time: None,
            end_entity: None,
            return_sunset: false,
            manual_override_duration: DEFAULT_MANUAL_OVERRIDE_DURATION,
            manual_override_reset: false,
            manual_threshold: None,
            manual_ignore_intermediate: false,
        }
    }
}

/// Configuration of one cover group.
///
/// Constructed only through `load`/`load_from_path` (or directly in tests) and
/// never mutated afterwards. Runtime switches live in `RuntimeToggles`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub name: String,
    pub cover_type: CoverType,
    pub entities: Vec<String>,
    pub location: LocationConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub blind_spot: BlindSpotConfig,
    #[serde(default)]
    pub vertical: VerticalConfig,
    #[serde(default)]
    pub awning: AwningConfig,
    #[serde(default)]
    pub tilt: TiltConfig,
    #[serde(default)]
    pub interpolation: InterpolationConfig,
    #[serde(default)]
    pub climate: ClimateConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        load()
    }

    /// Load configuration from an explicit path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        load_from_path(path)
    }

    /// Timezone of the configured location. Validation guarantees it parses.
    pub fn timezone(&self) -> Tz {
        self.location.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    /// Whether the climate overlay has enough inputs to run.
    pub fn climate_configured(&self) -> bool {
        self.climate.temp_entity.is_some()
    }

    pub fn log_config(&self) {
        log_block_start!("Loaded configuration for '{}'", self.name);
        log_indented!("Cover type: {}", self.cover_type.as_str());
        log_indented!("Entities: {}", self.entities.join(", "));
        log_indented!(
            "Location: {:.4}°, {:.4}° ({})",
            self.location.latitude,
            self.location.longitude,
            self.location.timezone
        );
        log_indented!(
            "Window: azimuth {}°, field of view {}°/{}°",
            self.window.azimuth,
            self.window.fov_left,
            self.window.fov_right
        );
        log_indented!(
            "Default position: {}%, sunset position: {}%",
            self.window.default_percentage,
            self.window.sunset_position
        );

        match self.cover_type {
            CoverType::Vertical => log_indented!(
                "Window height: {} m, shade distance: {} m",
                self.vertical.window_height,
                self.vertical.distance
            ),
            CoverType::Awning => log_indented!(
                "Awning: length {} m at {}°, window height {} m, shade distance {} m",
                self.awning.length,
                self.awning.angle,
                self.vertical.window_height,
                self.vertical.distance
            ),
            CoverType::Tilt => log_indented!(
                "Slats: distance {}, depth {}, mode {:?}",
                self.tilt.slat_distance,
                self.tilt.slat_depth,
                self.tilt.mode
            ),
        }

        if self.blind_spot.enabled {
            log_indented!(
                "Blind spot: {:?}° to {:?}° (elevation ceiling {:?})",
                self.blind_spot.left,
                self.blind_spot.right,
                self.blind_spot.elevation
            );
        }

        if self.interpolation.enabled {
            log_indented!("Output interpolation enabled");
        }
        if self.window.inverse_state {
            log_indented!("Output inverted");
        }

        if self.climate_configured() {
            log_indented!(
                "Climate: {}-{} °C (mode {})",
                self.climate.temp_low,
                self.climate.temp_high,
                if self.climate.enabled { "on" } else { "off" }
            );
        }

        let automation = &self.automation;
        log_indented!(
            "Automation: delta {}%, {} min between commands, manual override {} min",
            automation.delta_position,
            automation.delta_time,
            automation.manual_override_duration
        );
        if let Some(end) = automation.end_entity.as_ref().or(automation.end_time.as_ref()) {
            log_indented!(
                "Active until {}{}",
                end,
                if automation.return_sunset {
                    ", then return to sunset position"
                } else {
                    ""
                }
            );
        }
    }
}

#[cfg(any(test, feature = "testing-support"))]
impl Config {
    /// South-facing single-cover group in Amsterdam with every default applied.
    pub fn for_testing(cover_type: CoverType) -> Self {
        Self {
            name: "Test cover".to_string(),
            cover_type,
            entities: vec!["cover.living_room".to_string()],
            location: LocationConfig {
                latitude: 52.37,
                longitude: 4.89,
                elevation: 0.0,
                timezone: "Europe/Amsterdam".to_string(),
            },
            window: WindowConfig::default(),
            blind_spot: BlindSpotConfig::default(),
            vertical: VerticalConfig::default(),
            awning: AwningConfig::default(),
            tilt: TiltConfig::default(),
            interpolation: InterpolationConfig::default(),
            climate: ClimateConfig::default(),
            automation: AutomationConfig::default(),
        }
    }
}
