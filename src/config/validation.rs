//! Configuration validation functionality.
//!
//! Rejects geometry and thresholds that cannot produce a meaningful cover position,
//! so the calculation code can assume its inputs are sane.

use anyhow::{Context, Result};
use chrono::NaiveTime;

use super::{Config, CoverType};
use crate::constants::*;

/// Parse a literal time of day in `HH:MM:SS` (or `HH:MM`) form.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .with_context(|| format!("Invalid time of day '{value}', expected HH:MM:SS"))
}

/// Comprehensive configuration validation.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.name.trim().is_empty() {
        anyhow::bail!("name must not be empty");
    }

    validate_entities(config)?;
    validate_location(config)?;
    validate_window(config)?;
    validate_blind_spot(config)?;
    validate_dimensions(config)?;
    validate_interpolation(config)?;
    validate_climate(config)?;
    validate_automation(config)?;

    Ok(())
}

fn validate_entities(config: &Config) -> Result<()> {
    if config.entities.is_empty() {
        anyhow::bail!("entities must list at least one cover entity");
    }

    for entity in &config.entities {
        if !entity.starts_with("cover.") {
            anyhow::bail!("'{}' is not a cover entity (expected cover.<name>)", entity);
        }
    }

    Ok(())
}

fn validate_location(config: &Config) -> Result<()> {
    let location = &config.location;

    if !(-90.0..=90.0).contains(&location.latitude) {
        anyhow::bail!(
            "latitude must be between -90 and 90 degrees (got {})",
            location.latitude
        );
    }

    if !(-180.0..=180.0).contains(&location.longitude) {
        anyhow::bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            location.longitude
        );
    }

    location
        .timezone
        .parse::<chrono_tz::Tz>()
        .map_err(|_| anyhow::anyhow!("Unknown timezone '{}'", location.timezone))?;

    Ok(())
}

fn validate_percentage(value: f64, field: &str) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        anyhow::bail!("{} ({}) must be between 0 and 100", field, value);
    }
    Ok(())
}

fn validate_window(config: &Config) -> Result<()> {
    let window = &config.window;

    if !(0.0..360.0).contains(&window.azimuth) {
        anyhow::bail!(
            "window azimuth ({}) must be between 0 and 359 degrees",
            window.azimuth
        );
    }

    for (value, field) in [(window.fov_left, "fov_left"), (window.fov_right, "fov_right")] {
        if !(0.0..=180.0).contains(&value) {
            anyhow::bail!("{} ({}) must be between 0 and 180 degrees", field, value);
        }
    }

    validate_percentage(window.default_percentage, "default_percentage")?;
    validate_percentage(window.sunset_position, "sunset_position")?;

    if let Some(max) = window.max_position {
        validate_percentage(max, "max_position")?;
    }
    if let Some(min) = window.min_position {
        validate_percentage(min, "min_position")?;
    }
    if let (Some(min), Some(max)) = (window.min_position, window.max_position)
        && min >= max
    {
        anyhow::bail!(
            "min_position ({}) must be lower than max_position ({})",
            min,
            max
        );
    }

    for (value, field) in [
        (window.min_elevation, "min_elevation"),
        (window.max_elevation, "max_elevation"),
    ] {
        if let Some(value) = value
            && !(-90.0..=90.0).contains(&value)
        {
            anyhow::bail!("{} ({}) must be between -90 and 90 degrees", field, value);
        }
    }
    if let (Some(min), Some(max)) = (window.min_elevation, window.max_elevation)
        && min >= max
    {
        anyhow::bail!(
            "max_elevation ({}) must be greater than min_elevation ({})",
            max,
            min
        );
    }

    Ok(())
}

fn validate_blind_spot(config: &Config) -> Result<()> {
    let blind_spot = &config.blind_spot;
    if !blind_spot.enabled {
        return Ok(());
    }

    let (Some(left), Some(right)) = (blind_spot.left, blind_spot.right) else {
        anyhow::bail!("blind_spot requires both left and right when enabled");
    };

    let fov_total = config.window.fov_left + config.window.fov_right;
    if left < 0.0 || right > fov_total {
        anyhow::bail!(
            "blind_spot edges ({}, {}) must lie within the field of view (0-{})",
            left,
            right,
            fov_total
        );
    }

    if right <= left {
        anyhow::bail!(
            "blind_spot right ({}) must be greater than blind_spot left ({})",
            right,
            left
        );
    }

    if let Some(elevation) = blind_spot.elevation
        && !(0.0..=90.0).contains(&elevation)
    {
        anyhow::bail!(
            "blind_spot elevation ({}) must be between 0 and 90 degrees",
            elevation
        );
    }

    Ok(())
}

fn validate_dimensions(config: &Config) -> Result<()> {
    match config.cover_type {
        CoverType::Vertical | CoverType::Awning => {
            if config.vertical.window_height <= 0.0 {
                anyhow::bail!(
                    "window_height ({}) must be greater than 0 meters",
                    config.vertical.window_height
                );
            }
            if config.vertical.distance <= 0.0 {
                anyhow::bail!(
                    "distance ({}) must be greater than 0 meters",
                    config.vertical.distance
                );
            }
        }
        CoverType::Tilt => {}
    }

    if config.cover_type == CoverType::Awning {
        if config.awning.length <= 0.0 {
            anyhow::bail!(
                "awning length ({}) must be greater than 0 meters",
                config.awning.length
            );
        }
        if !(0.0..90.0).contains(&config.awning.angle) {
            anyhow::bail!(
                "awning angle ({}) must be between 0 and 89 degrees",
                config.awning.angle
            );
        }
    }

    if config.cover_type == CoverType::Tilt {
        if config.tilt.slat_depth <= 0.0 {
            anyhow::bail!(
                "slat_depth ({}) must be greater than 0",
                config.tilt.slat_depth
            );
        }
        if config.tilt.slat_distance <= 0.0 {
            anyhow::bail!(
                "slat_distance ({}) must be greater than 0",
                config.tilt.slat_distance
            );
        }
    }

    Ok(())
}

fn validate_interpolation(config: &Config) -> Result<()> {
    let interpolation = &config.interpolation;
    if !interpolation.enabled {
        return Ok(());
    }

    let has_lists = !interpolation.list.is_empty() && !interpolation.list_new.is_empty();
    let has_endpoints = interpolation.start.is_some() && interpolation.end.is_some();

    if !has_lists && !has_endpoints {
        anyhow::bail!("interpolation requires either start and end, or list and list_new");
    }

    if has_lists {
        if interpolation.list.len() != interpolation.list_new.len() {
            anyhow::bail!(
                "interpolation list ({} values) and list_new ({} values) must have the same length",
                interpolation.list.len(),
                interpolation.list_new.len()
            );
        }
        if interpolation.list.len() < 2 {
            anyhow::bail!("interpolation lists need at least two breakpoints");
        }
        if interpolation.list.windows(2).any(|pair| pair[0] >= pair[1]) {
            anyhow::bail!("interpolation list must be strictly increasing");
        }
        for value in interpolation.list.iter().chain(&interpolation.list_new) {
            validate_percentage(*value, "interpolation breakpoint")?;
        }
    } else if let (Some(start), Some(end)) = (interpolation.start, interpolation.end) {
        validate_percentage(start, "interpolation start")?;
        validate_percentage(end, "interpolation end")?;
    }

    if config.window.inverse_state {
        log_warning!(
            "inverse_state and interpolation are both enabled; inversion will be skipped"
        );
    }

    Ok(())
}

fn validate_climate(config: &Config) -> Result<()> {
    let climate = &config.climate;

    if climate.temp_low >= climate.temp_high {
        anyhow::bail!(
            "temp_low ({}) must be lower than temp_high ({})",
            climate.temp_low,
            climate.temp_high
        );
    }

    if climate.enabled && climate.temp_entity.is_none() {
        anyhow::bail!("climate mode requires temp_entity");
    }

    if climate.lux_threshold < 0.0 {
        anyhow::bail!("lux_threshold ({}) must not be negative", climate.lux_threshold);
    }
    if climate.irradiance_threshold < 0.0 {
        anyhow::bail!(
            "irradiance_threshold ({}) must not be negative",
            climate.irradiance_threshold
        );
    }

    Ok(())
}

fn validate_automation(config: &Config) -> Result<()> {
    let automation = &config.automation;

    if automation.delta_position > 100 {
        anyhow::bail!(
            "delta_position ({}) must be between 0 and 100",
            automation.delta_position
        );
    }

    if automation.delta_time < 0 {
        anyhow::bail!(
            "delta_time ({} minutes) must not be negative",
            automation.delta_time
        );
    }

    if automation.manual_override_duration <= 0 {
        anyhow::bail!(
            "manual_override_duration ({} minutes) must be greater than 0",
            automation.manual_override_duration
        );
    }

    if let Some(threshold) = automation.manual_threshold
        && threshold > MAXIMUM_MANUAL_THRESHOLD
    {
        anyhow::bail!(
            "manual_threshold ({}) must be between 0 and {}",
            threshold,
            MAXIMUM_MANUAL_THRESHOLD
        );
    }

    let start = automation
        .start_time
        .as_deref()
        .map(parse_time_of_day)
        .transpose()
        .context("Invalid start_time")?;
    let end = automation
        .end_time
        .as_deref()
        .map(parse_time_of_day)
        .transpose()
        .context("Invalid end_time")?;

    // Midnight as end time means "until the end of the day"
    if let (Some(start), Some(end)) = (start, end)
        && end != NaiveTime::MIN
        && start > end
    {
        log_warning!(
            "start_time ({}) is after end_time ({}); the time window will not restrict control",
            start,
            end
        );
    }

    if automation.return_sunset
        && automation.end_time.is_none()
        && automation.end_entity.is_none()
    {
        anyhow::bail!("return_sunset requires end_time or end_entity");
    }

    Ok(())
}
