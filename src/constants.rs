//! Application-wide defaults and limits.
//!
//! Defaults are applied through serde when the configuration is parsed, limits are
//! enforced by `config::validation`.

// # Window geometry defaults
pub const DEFAULT_WINDOW_AZIMUTH: f64 = 180.0;
pub const DEFAULT_FOV: f64 = 90.0;
pub const DEFAULT_PERCENTAGE: f64 = 60.0;
pub const DEFAULT_SUNSET_POSITION: f64 = 0.0;
pub const DEFAULT_SUNSET_OFFSET: i64 = 0; // minutes
pub const DEFAULT_SUNRISE_OFFSET: i64 = 0; // minutes

// The computed band never extends past the window plane
pub const MAX_EFFECTIVE_FOV: f64 = 90.0;

// # Cover dimensions (meters for vertical/awning, centimeters for slats)
pub const DEFAULT_WINDOW_HEIGHT: f64 = 2.1;
pub const DEFAULT_DISTANCE: f64 = 0.5;
pub const DEFAULT_AWNING_LENGTH: f64 = 2.1;
pub const DEFAULT_AWNING_ANGLE: f64 = 0.0;
pub const DEFAULT_SLAT_DEPTH: f64 = 3.0;
pub const DEFAULT_SLAT_DISTANCE: f64 = 2.0;

// # Climate defaults
pub const DEFAULT_TEMP_LOW: f64 = 21.0;
pub const DEFAULT_TEMP_HIGH: f64 = 25.0;
pub const DEFAULT_LUX_THRESHOLD: f64 = 1000.0;
pub const DEFAULT_IRRADIANCE_THRESHOLD: f64 = 300.0;
pub const DEFAULT_WEATHER_CONDITIONS: &[&str] = &["sunny", "partlycloudy", "cloudy", "clear"];

// Tilt positions used by the climate tree, in slat degrees
pub const TILT_GLARE_ANGLE: f64 = 45.0;
pub const TILT_NEUTRAL_ANGLE: f64 = 80.0;
pub const TILT_CLOSED_BI_ANGLE: f64 = 110.0;

// # Automation defaults
pub const DEFAULT_DELTA_POSITION: u8 = 1;
pub const DEFAULT_DELTA_TIME: i64 = 2; // minutes
pub const DEFAULT_START_TIME: &str = "00:00:00";
pub const DEFAULT_MANUAL_OVERRIDE_DURATION: i64 = 15; // minutes
pub const MAXIMUM_MANUAL_THRESHOLD: u8 = 99;

// # Sun provider
pub const SOLAR_SAMPLE_INTERVAL_MINUTES: i64 = 5;
pub const FALLBACK_DELTA_T: f64 = 69.0; // seconds

// # Host runtime conventions
pub const SUN_ENTITY: &str = "sun.sun";
pub const STATE_UNKNOWN: &str = "unknown";
pub const STATE_UNAVAILABLE: &str = "unavailable";
pub const STATE_OPENING: &str = "opening";
pub const STATE_CLOSING: &str = "closing";
pub const ATTR_CURRENT_POSITION: &str = "current_position";
pub const ATTR_CURRENT_TILT_POSITION: &str = "current_tilt_position";
pub const ATTR_CURRENT_TEMPERATURE: &str = "current_temperature";
pub const ATTR_TEMPERATURE: &str = "temperature";

// # Event loop
pub const IDLE_WAKEUP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_SIMULATION_STEP_MINUTES: u64 = 5;

// # Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

// # Test constants
#[cfg(test)]
pub mod test_constants {
    pub const TEST_LATITUDE: f64 = 52.37;
    pub const TEST_LONGITUDE: f64 = 4.89;
    pub const TEST_TIMEZONE: &str = "Europe/Amsterdam";
    pub const TEST_COVER: &str = "cover.living_room";
}
