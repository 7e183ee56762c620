use adaptive_cover::calculation::{
    ClimateReadings, DayDefaults, SunGeometry, VisibilityWindow, Vertical, WindowGeometry,
};
use adaptive_cover::config::{Config, CoverType};
use adaptive_cover::policy::{PolicyInputs, PositionPolicy, interp, to_position};
use adaptive_cover::sun::{SolarSample, SunTimes};
use adaptive_cover::toggles::RuntimeToggles;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap()
}

fn sun_times() -> SunTimes {
    SunTimes {
        sunrise: Utc.with_ymd_and_hms(2024, 6, 21, 3, 18, 0).unwrap(),
        sunset: Utc.with_ymd_and_hms(2024, 6, 21, 20, 6, 0).unwrap(),
    }
}

fn position_at(config: &Config, azimuth: f64, elevation: f64) -> u8 {
    let toggles = RuntimeToggles::from_config(config);
    let readings = ClimateReadings::default();
    PositionPolicy::new(config)
        .evaluate(PolicyInputs {
            sample: SolarSample { azimuth, elevation },
            sun_times: sun_times(),
            visibility: VisibilityWindow::default(),
            readings: &readings,
            toggles: &toggles,
            now: noon(),
        })
        .final_position
}

fn elevation_strategy() -> impl Strategy<Value = f64> {
    0.5..89.5
}

/// Geometry of the default south-facing test window
#[cfg(test)]
mod window_geometry_tests {
    use super::*;

    proptest! {
        /// The sun left and right of the boresight by the same angle gives the same position
        #[test]
        fn test_position_symmetric_around_boresight(
            offset in 0.0..85.0,
            elevation in elevation_strategy()
        ) {
            let config = Config::for_testing(CoverType::Vertical);
            let azimuth = config.window.azimuth;

            let left = position_at(&config, azimuth - offset, elevation);
            let right = position_at(&config, azimuth + offset, elevation);
            prop_assert_eq!(left, right);
        }

        /// Mirroring the window (swapping the field-of-view sides) and the sun's
        /// offset from the boresight leaves `valid` unchanged
        #[test]
        fn test_valid_symmetric_under_mirrored_field_of_view(
            fov_left in 0.0f64..180.0,
            fov_right in 0.0f64..180.0,
            gamma in -179.0f64..179.0
        ) {
            let edge = |fov: f64| (gamma.abs() - fov.min(90.0)).abs();
            prop_assume!(edge(fov_left) > 1e-6 && edge(fov_right) > 1e-6);

            let valid = |left: f64, right: f64, gamma: f64| {
                let mut config = Config::for_testing(CoverType::Vertical);
                config.window.fov_left = left;
                config.window.fov_right = right;
                let window = WindowGeometry::from_config(&config);
                let sample = SolarSample {
                    azimuth: window.azimuth - gamma,
                    elevation: 30.0,
                };
                SunGeometry::new(sample, window, DayDefaults::from_config(&config), sun_times(), noon())
                    .valid()
            };

            prop_assert_eq!(
                valid(fov_left, fov_right, gamma),
                valid(fov_right, fov_left, -gamma)
            );
        }

        /// A south window with 90° each side sees the sun on [90, 270)
        #[test]
        fn test_band_membership_matches_field_of_view(azimuth in 0.0..360.0) {
            let config = Config::for_testing(CoverType::Vertical);
            let window = WindowGeometry::from_config(&config);
            prop_assert_eq!(
                window.azimuth_in_band(azimuth),
                (90.0..270.0).contains(&azimuth)
            );
        }
    }
}

/// Vertical blind model
#[cfg(test)]
mod vertical_tests {
    use super::*;

    proptest! {
        /// A higher sun never needs the blind lower
        #[test]
        fn test_vertical_monotonic_in_elevation(
            gamma in -80.0..80.0,
            low in elevation_strategy(),
            delta in 0.0f64..30.0
        ) {
            let blind = Vertical { distance: 0.5, window_height: 2.1 };
            let high: f64 = (low + delta).min(89.5);
            prop_assert!(blind.percentage(gamma, high) >= blind.percentage(gamma, low));
        }

        /// The blind height never leaves the window
        #[test]
        fn test_vertical_height_within_window(
            gamma in -89.0..89.0,
            elevation in elevation_strategy(),
            distance in 0.1..5.0,
            window_height in 0.5..4.0
        ) {
            let blind = Vertical { distance, window_height };
            let height = blind.height(gamma, elevation);
            prop_assert!((0.0..=window_height).contains(&height));

            let percentage = blind.percentage(gamma, elevation);
            prop_assert!((0.0..=100.0).contains(&percentage));
        }
    }
}

/// Output transforms
#[cfg(test)]
mod output_tests {
    use super::*;

    proptest! {
        /// Any value maps to a valid device position
        #[test]
        fn test_to_position_is_clamped(value in -1.0e6..1.0e6) {
            let position = to_position(value);
            prop_assert!(position <= 100);
        }

        /// Interpolated positions stay within the configured range, or snap to 0/100
        #[test]
        fn test_interpolation_within_bounds(
            state in 0.0..=100.0,
            start in 0.0..40.0,
            end in 60.0..100.0
        ) {
            let mut config = Config::for_testing(CoverType::Vertical);
            config.interpolation.enabled = true;
            config.interpolation.start = Some(start);
            config.interpolation.end = Some(end);

            let mapped = PositionPolicy::new(&config).interpolate(state);
            prop_assert!(
                mapped == 0.0 || mapped == 100.0 || (start..=end).contains(&mapped),
                "{state} mapped to {mapped} outside [{start}, {end}]"
            );
        }

        /// Linear interpolation is monotonic over increasing breakpoints
        #[test]
        fn test_interp_monotonic(a in -10.0..110.0, b in -10.0..110.0) {
            let xp = [0.0, 30.0, 100.0];
            let fp = [5.0, 50.0, 95.0];
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(interp(low, &xp, &fp) <= interp(high, &xp, &fp));
        }
    }
}
