//! Sun position provider.
//!
//! Wraps the SPA implementation from `solar-positioning` for azimuth/elevation and the
//! `sunrise` crate for sunrise/sunset, both evaluated for the configured location.
//! A calendar day is sampled every five minutes from local midnight to the next
//! local midnight so the visibility window of a window can be scanned once per day.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use solar_positioning::{RefractionCorrection, spa, time::DeltaT};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use crate::config::Config;
use crate::constants::{FALLBACK_DELTA_T, SOLAR_SAMPLE_INTERVAL_MINUTES};

/// Sun position at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolarSample {
    /// Compass bearing in degrees, clockwise from north.
    pub azimuth: f64,
    /// Degrees above the horizon.
    pub elevation: f64,
}

/// Sunrise and sunset of one calendar day, in UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Solar calculations for a fixed observer.
#[derive(Debug, Clone)]
pub struct SunData {
    latitude: f64,
    longitude: f64,
    elevation: f64,
    timezone: Tz,
}

impl SunData {
    pub fn new(latitude: f64, longitude: f64, elevation: f64, timezone: Tz) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            timezone,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.location.latitude,
            config.location.longitude,
            config.location.elevation,
            config.timezone(),
        )
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Calendar date at the observer for a UTC instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// Sun azimuth and elevation at `instant`, with standard atmospheric refraction.
    pub fn position_at(&self, instant: DateTime<Utc>) -> Result<SolarSample> {
        let delta_t = DeltaT::estimate_from_date_like(instant).unwrap_or(FALLBACK_DELTA_T);
        let position = spa::solar_position(
            instant,
            self.latitude,
            self.longitude,
            self.elevation,
            delta_t,
            Some(RefractionCorrection::standard()),
        )
        .map_err(|e| anyhow::anyhow!("Solar position calculation failed: {e:?}"))?;

        Ok(SolarSample {
            azimuth: position.azimuth(),
            elevation: position.elevation_angle(),
        })
    }

    /// Sampling instants for `date`: local midnight through the next local midnight.
    pub fn times(&self, date: NaiveDate) -> Vec<DateTime<Utc>> {
        let start = self.local_midnight(date);
        let end = date
            .succ_opt()
            .map(|next| self.local_midnight(next))
            .unwrap_or(start + Duration::days(1));
        let step = Duration::minutes(SOLAR_SAMPLE_INTERVAL_MINUTES);

        let mut times = Vec::with_capacity(290);
        let mut current = start;
        while current <= end {
            times.push(current);
            current += step;
        }
        times
    }

    /// Every sampling instant of `date` paired with the sun position at that time.
    pub fn day_samples(&self, date: NaiveDate) -> Result<Vec<(DateTime<Utc>, SolarSample)>> {
        self.times(date)
            .into_iter()
            .map(|instant| Ok((instant, self.position_at(instant)?)))
            .collect()
    }

    /// Sunrise and sunset for `date`.
    pub fn sun_times(&self, date: NaiveDate) -> Result<SunTimes> {
        let coord = Coordinates::new(self.latitude, self.longitude)
            .context("Invalid coordinates for sunrise calculation")?;
        let solar_day = SolarDay::new(coord, date);
        Ok(SunTimes {
            sunrise: solar_day.event_time(SolarEvent::Sunrise),
            sunset: solar_day.event_time(SolarEvent::Sunset),
        })
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            // Midnight skipped by a DST change; fall back to the UTC reading
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }
}
