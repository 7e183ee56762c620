use super::*;
use crate::config::{ClimateConfig, TiltMode};
use crate::sun::{SolarSample, SunTimes};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 21, hour, minute, 0).unwrap()
}

fn midsummer() -> SunTimes {
    SunTimes {
        sunrise: at(3, 18),
        sunset: at(20, 6),
    }
}

fn south_window() -> WindowGeometry {
    WindowGeometry {
        azimuth: 180.0,
        fov_left: 90.0,
        fov_right: 90.0,
        min_elevation: None,
        max_elevation: None,
        blind_spot: None,
    }
}

fn defaults() -> DayDefaults {
    DayDefaults {
        default_percentage: 60.0,
        sunset_position: 0.0,
        sunset_offset: Duration::zero(),
        sunrise_offset: Duration::zero(),
    }
}

fn geometry(window: WindowGeometry, azimuth: f64, elevation: f64) -> SunGeometry {
    SunGeometry::new(
        SolarSample { azimuth, elevation },
        window,
        defaults(),
        midsummer(),
        at(12, 0),
    )
}

fn vertical() -> Vertical {
    Vertical {
        distance: 0.5,
        window_height: 2.1,
    }
}

fn vertical_model(azimuth: f64, elevation: f64) -> CoverModel {
    CoverModel::new(
        geometry(south_window(), azimuth, elevation),
        CoverShape::Vertical(vertical()),
        PositionLimits::default(),
    )
}

fn tilt_model(mode: TiltMode, azimuth: f64, elevation: f64) -> CoverModel {
    CoverModel::new(
        geometry(south_window(), azimuth, elevation),
        CoverShape::Tilt(Tilt {
            slat_distance: 2.0,
            slat_depth: 3.0,
            mode,
        }),
        PositionLimits::default(),
    )
}

// # Geometry

#[test]
fn test_south_window_sun_straight_ahead() {
    let model = vertical_model(180.0, 45.0);

    assert_eq!(model.sun.gamma(), 0.0);
    assert!(model.sun.valid());
    assert!((model.calculate_position() - 0.5).abs() < 1e-9);
    assert_eq!(model.calculate_percentage(), 24.0);
    assert_eq!(NormalCoverState::new(&model).get_state(), 24.0);
}

#[test]
fn test_sun_below_horizon_uses_default() {
    let model = vertical_model(180.0, -5.0);

    assert!(!model.sun.valid());
    assert!(!model.sun.sunset_valid());
    assert_eq!(NormalCoverState::new(&model).get_state(), 60.0);

    let mut night = model.clone();
    night.sun.now = at(22, 0);
    assert!(night.sun.sunset_valid());
    assert_eq!(NormalCoverState::new(&night).get_state(), 0.0);
}

#[test]
fn test_gamma_wraps_around_north() {
    let mut window = south_window();
    window.azimuth = 10.0;
    assert_eq!(geometry(window.clone(), 350.0, 20.0).gamma(), 20.0);

    window.azimuth = 350.0;
    assert_eq!(geometry(window, 10.0, 20.0).gamma(), -20.0);
}

#[test]
fn test_valid_respects_fov_and_ninety_degree_cap() {
    // Sun 60 degrees left of the boresight
    assert!(geometry(south_window(), 120.0, 30.0).valid());

    let mut narrow = south_window();
    narrow.fov_left = 45.0;
    assert!(!geometry(narrow, 120.0, 30.0).valid());

    let mut wide = south_window();
    wide.fov_left = 150.0;
    // gamma = 95 is behind the window plane regardless of the configured fov
    assert!(!geometry(wide, 85.0, 30.0).valid());
}

#[test]
fn test_valid_elevation_bounds() {
    let mut window = south_window();
    assert!(geometry(window.clone(), 180.0, 0.0).valid_elevation());
    assert!(!geometry(window.clone(), 180.0, -0.1).valid_elevation());

    window.min_elevation = Some(10.0);
    assert!(!geometry(window.clone(), 180.0, 5.0).valid_elevation());
    assert!(geometry(window.clone(), 180.0, 70.0).valid_elevation());

    window.max_elevation = Some(50.0);
    assert!(!geometry(window.clone(), 180.0, 70.0).valid_elevation());
    assert!(geometry(window.clone(), 180.0, 50.0).valid_elevation());

    window.min_elevation = None;
    // Only a ceiling: negative elevations pass the elevation check
    assert!(geometry(window, 180.0, -5.0).valid_elevation());
}

#[test]
fn test_blind_spot() {
    let mut window = south_window();
    window.blind_spot = Some(BlindSpot {
        left: 10.0,
        right: 30.0,
        elevation: None,
    });

    // gamma = 70 lies between the edges at 80 and 60
    let in_spot = geometry(window.clone(), 110.0, 30.0);
    assert!(in_spot.is_sun_in_blind_spot());
    assert!(in_spot.valid());
    assert!(!in_spot.direct_sun_valid());

    let outside = geometry(window.clone(), 150.0, 30.0);
    assert!(!outside.is_sun_in_blind_spot());
    assert!(outside.direct_sun_valid());

    window.blind_spot = Some(BlindSpot {
        left: 10.0,
        right: 30.0,
        elevation: Some(25.0),
    });
    assert!(!geometry(window.clone(), 110.0, 30.0).is_sun_in_blind_spot());
    assert!(geometry(window, 110.0, 25.0).is_sun_in_blind_spot());
}

#[test]
fn test_blind_spot_forces_default_position() {
    let mut window = south_window();
    window.blind_spot = Some(BlindSpot {
        left: 10.0,
        right: 30.0,
        elevation: None,
    });
    let model = CoverModel::new(
        geometry(window, 110.0, 30.0),
        CoverShape::Vertical(vertical()),
        PositionLimits::default(),
    );
    assert_eq!(NormalCoverState::new(&model).get_state(), 60.0);
}

#[test]
fn test_sunset_and_sunrise_offsets() {
    let mut sun = geometry(south_window(), 300.0, -1.0);
    sun.now = at(20, 16);
    assert!(sun.sunset_valid());

    sun.defaults.sunset_offset = Duration::minutes(30);
    assert!(!sun.sunset_valid());
    assert_eq!(sun.default(), 60.0);

    sun.now = at(3, 30);
    assert!(!sun.sunset_valid());
    sun.defaults.sunrise_offset = Duration::minutes(20);
    assert!(sun.sunset_valid());
    assert_eq!(sun.default(), 0.0);
}

#[test]
fn test_band_edges_wrap() {
    let mut window = south_window();
    window.azimuth = 10.0;
    window.fov_left = 30.0;
    window.fov_right = 40.0;

    assert_eq!(window.azi_min_abs(), 340.0);
    assert_eq!(window.azi_max_abs(), 50.0);
    assert!(window.azimuth_in_band(340.0));
    assert!(window.azimuth_in_band(0.0));
    assert!(window.azimuth_in_band(49.9));
    assert!(!window.azimuth_in_band(50.0));
    assert!(!window.azimuth_in_band(180.0));
}

#[test]
fn test_solar_times_scan() {
    let window = south_window();
    let samples: Vec<_> = (0..=24)
        .map(|hour| {
            let elevation = if (6..=18).contains(&hour) { 20.0 } else { -10.0 };
            let azimuth = hour as f64 * 15.0;
            (
                Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap() + Duration::hours(hour),
                SolarSample { azimuth, elevation },
            )
        })
        .collect();

    let visible = solar_times(&window, &samples);
    // Band is [90, 270): hours 6 through 17 qualify
    assert_eq!(visible.start, Some(at(6, 0)));
    assert_eq!(visible.end, Some(at(17, 0)));

    let mut north = window;
    north.azimuth = 0.0;
    north.fov_left = 20.0;
    north.fov_right = 20.0;
    assert_eq!(solar_times(&north, &samples), VisibilityWindow::default());
}

// # Shapes

#[test]
fn test_vertical_height_is_clipped() {
    let blind = vertical();
    assert_eq!(blind.height(0.0, 89.0), 2.1);
    assert_eq!(blind.height(120.0, 30.0), 0.0);
    assert!((blind.height(20.0, 30.0) - 0.30720166).abs() < 1e-6);
}

#[test]
fn test_awning_extension() {
    let awning = Awning {
        vertical: vertical(),
        length: 2.1,
        angle: 0.0,
    };
    assert!((awning.extension(0.0, 45.0) - 1.6).abs() < 1e-9);
    assert_eq!(awning.percentage(0.0, 45.0), 76.0);
}

#[test]
fn test_tilt_slat_angle_and_modes() {
    let bi = tilt_model(TiltMode::Bidirectional, 180.0, 45.0);
    assert!((bi.calculate_position() - 106.8745).abs() < 1e-3);
    assert_eq!(bi.calculate_percentage(), 59.0);

    let single = tilt_model(TiltMode::Single, 180.0, 45.0);
    assert_eq!(single.calculate_percentage(), 119.0);
    // Clipped to the valid range by the state
    assert_eq!(NormalCoverState::new(&single).get_state(), 100.0);
}

#[test]
fn test_tilt_wide_slats_do_not_produce_nan() {
    let tilt = Tilt {
        slat_distance: 5.0,
        slat_depth: 2.0,
        mode: TiltMode::Bidirectional,
    };
    assert!(tilt.slat_angle(0.0, 5.0).is_finite());
}

// # Limits

#[test]
fn test_max_position_clamp() {
    let mut model = vertical_model(180.0, 80.0);
    model.limits.max_position = Some(50.0);
    assert_eq!(NormalCoverState::new(&model).get_state(), 50.0);

    // Sun-only ceiling does not apply to the default position
    let mut night = vertical_model(180.0, -5.0);
    night.limits.max_position = Some(50.0);
    night.limits.max_sun_only = true;
    assert_eq!(NormalCoverState::new(&night).get_state(), 60.0);

    night.limits.max_sun_only = false;
    assert_eq!(NormalCoverState::new(&night).get_state(), 50.0);
}

#[test]
fn test_min_position_clamp() {
    let mut model = vertical_model(180.0, 10.0);
    model.limits.min_position = Some(30.0);
    assert_eq!(NormalCoverState::new(&model).get_state(), 30.0);

    model.limits.min_sun_only = true;
    assert_eq!(NormalCoverState::new(&model).get_state(), 30.0);

    let limits = PositionLimits {
        min_position: Some(0.0),
        max_position: Some(100.0),
        ..PositionLimits::default()
    };
    assert_eq!(limits.apply(42.0, true), 42.0);
}

// # Climate

fn climate_settings() -> ClimateConfig {
    ClimateConfig {
        temp_entity: Some("sensor.inside".to_string()),
        ..ClimateConfig::default()
    }
}

fn readings(temperature: f64) -> ClimateReadings {
    ClimateReadings {
        inside_temperature: Some(temperature),
        ..ClimateReadings::default()
    }
}

fn presence(domain: &str, state: &str) -> Option<PresenceReading> {
    Some(PresenceReading {
        domain: domain.to_string(),
        state: state.to_string(),
    })
}

#[test]
fn test_presence_by_domain() {
    let settings = climate_settings();
    let cases = [
        ("device_tracker", "home", true),
        ("device_tracker", "not_home", false),
        ("zone", "2", true),
        ("zone", "0", false),
        ("binary_sensor", "on", true),
        ("input_boolean", "off", false),
        ("sensor", "whatever", true),
    ];

    for (domain, state, expected) in cases {
        let mut r = readings(22.0);
        r.presence = presence(domain, state);
        let data = ClimateCoverData::new(&r, &settings, ClimateSwitches::default());
        assert_eq!(data.is_presence(), expected, "{domain}={state}");
    }

    let r = readings(22.0);
    assert!(ClimateCoverData::new(&r, &settings, ClimateSwitches::default()).is_presence());
}

#[test]
fn test_temperature_source_and_seasons() {
    let mut settings = climate_settings();
    let mut r = readings(20.0);
    r.outside_temperature = Some(30.0);

    let inside = ClimateCoverData::new(&r, &settings, ClimateSwitches::default());
    assert_eq!(inside.current_temperature(), Some(20.0));
    assert!(inside.is_winter());
    assert!(!inside.is_summer());

    let switches = ClimateSwitches {
        prefer_outside_temp: true,
        ..ClimateSwitches::default()
    };
    let outside = ClimateCoverData::new(&r, &settings, switches);
    assert_eq!(outside.current_temperature(), Some(30.0));
    assert!(outside.is_summer());

    settings.outside_threshold = Some(32.0);
    let gated = ClimateCoverData::new(&r, &settings, switches);
    assert!(!gated.is_summer());

    let unknown = ClimateReadings::default();
    let data = ClimateCoverData::new(&unknown, &settings, ClimateSwitches::default());
    assert!(!data.is_winter());
    assert!(!data.is_summer());
}

#[test]
fn test_is_sunny_and_light_thresholds() {
    let mut settings = climate_settings();
    let mut r = readings(22.0);
    r.weather_state = Some("rainy".to_string());
    r.lux = Some(500.0);
    r.irradiance = Some(400.0);

    // No weather entity configured
    assert!(ClimateCoverData::new(&r, &settings, ClimateSwitches::default()).is_sunny());

    settings.weather_entity = Some("weather.home".to_string());
    assert!(!ClimateCoverData::new(&r, &settings, ClimateSwitches::default()).is_sunny());
    r.weather_state = Some("partlycloudy".to_string());
    assert!(ClimateCoverData::new(&r, &settings, ClimateSwitches::default()).is_sunny());

    let switches = ClimateSwitches {
        lux_enabled: true,
        irradiance_enabled: true,
        ..ClimateSwitches::default()
    };
    // Entities not configured
    assert!(!ClimateCoverData::new(&r, &settings, switches).lux());

    settings.lux_entity = Some("sensor.lux".to_string());
    settings.irradiance_entity = Some("sensor.irradiance".to_string());
    let data = ClimateCoverData::new(&r, &settings, switches);
    assert!(data.lux());
    assert!(!data.irradiance());

    assert!(!ClimateCoverData::new(&r, &settings, ClimateSwitches::default()).lux());
}

#[test]
fn test_climate_without_presence() {
    let settings = climate_settings();
    let model = vertical_model(180.0, 45.0);

    let mut hot = readings(30.0);
    hot.presence = presence("binary_sensor", "off");
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&hot, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 0.0);

    let mut cold = readings(15.0);
    cold.presence = presence("binary_sensor", "off");
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&cold, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 100.0);

    let mut mild = readings(23.0);
    mild.presence = presence("binary_sensor", "off");
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&mild, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 60.0);

    // Sun not in front of the window: default even when hot
    let behind = vertical_model(0.0, 45.0);
    let state = ClimateCoverState::new(
        &behind,
        ClimateCoverData::new(&hot, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 60.0);
}

#[test]
fn test_climate_with_presence_glare_precedence() {
    let mut settings = climate_settings();
    settings.weather_entity = Some("weather.home".to_string());
    let model = vertical_model(180.0, 45.0);

    // Cold and cloudy: low light wins, winter opens fully while the sun is valid
    let mut cold_cloudy = readings(15.0);
    cold_cloudy.weather_state = Some("rainy".to_string());
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&cold_cloudy, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 100.0);

    // Mild and cloudy: default
    let mut mild_cloudy = readings(23.0);
    mild_cloudy.weather_state = Some("rainy".to_string());
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&mild_cloudy, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 60.0);

    // Mild and sunny: geometric
    let mut mild_sunny = readings(23.0);
    mild_sunny.weather_state = Some("sunny".to_string());
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&mild_sunny, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 24.0);

    // Hot with a transparent blind: fully closed
    settings.transparent_blind = true;
    let mut hot = readings(30.0);
    hot.weather_state = Some("rainy".to_string());
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&hot, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 0.0);
}

#[test]
fn test_climate_result_is_clamped() {
    let settings = climate_settings();
    let mut model = vertical_model(180.0, 45.0);
    model.limits.max_position = Some(80.0);

    let mut cold = readings(15.0);
    cold.presence = presence("device_tracker", "not_home");
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&cold, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 80.0);
}

#[test]
fn test_tilt_climate_with_presence() {
    let settings = climate_settings();
    let model = tilt_model(TiltMode::Bidirectional, 180.0, 45.0);

    let hot = readings(30.0);
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&hot, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 25.0);

    let cold = readings(15.0);
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&cold, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 59.0);

    let mild = readings(23.0);
    let behind = tilt_model(TiltMode::Bidirectional, 0.0, 45.0);
    let state = ClimateCoverState::new(
        &behind,
        ClimateCoverData::new(&mild, &settings, ClimateSwitches::default()),
    );
    assert!((state.get_state() - 80.0 / 180.0 * 100.0).abs() < 1e-9);
}

#[test]
fn test_tilt_climate_without_presence() {
    let settings = climate_settings();

    let mut cold = readings(15.0);
    cold.presence = presence("binary_sensor", "off");

    let single = tilt_model(TiltMode::Single, 180.0, 45.0);
    let state = ClimateCoverState::new(
        &single,
        ClimateCoverData::new(&cold, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 100.0);

    // Parallel to the sun rays: beta = 31.57 degrees for gamma 20, elevation 30
    let bi = tilt_model(TiltMode::Bidirectional, 160.0, 30.0);
    let state = ClimateCoverState::new(
        &bi,
        ClimateCoverData::new(&cold, &settings, ClimateSwitches::default()),
    );
    assert!((state.get_state() - 67.537).abs() < 1e-2);

    let bi_behind = tilt_model(TiltMode::Bidirectional, 0.0, 30.0);
    let state = ClimateCoverState::new(
        &bi_behind,
        ClimateCoverData::new(&cold, &settings, ClimateSwitches::default()),
    );
    assert!((state.get_state() - 110.0 / 180.0 * 100.0).abs() < 1e-9);

    let mut hot = readings(30.0);
    hot.presence = presence("binary_sensor", "off");
    let state = ClimateCoverState::new(
        &bi,
        ClimateCoverData::new(&hot, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 0.0);
}

#[test]
fn test_tilt_climate_falls_back_without_temperature_or_sun() {
    let settings = climate_settings();
    let model = tilt_model(TiltMode::Bidirectional, 180.0, 45.0);

    let unknown = ClimateReadings::default();
    let state = ClimateCoverState::new(
        &model,
        ClimateCoverData::new(&unknown, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 59.0);

    let below = tilt_model(TiltMode::Bidirectional, 180.0, -3.0);
    let hot = readings(30.0);
    let state = ClimateCoverState::new(
        &below,
        ClimateCoverData::new(&hot, &settings, ClimateSwitches::default()),
    );
    assert_eq!(state.get_state(), 60.0);
}
