//! Per-day solar data: sunrise, sunset and the window's visibility window.
//!
//! Scanning a day of samples is the only expensive step of a refresh, so results are
//! cached per local date. The event loop prefetches the next day on a worker thread
//! and hands the result back through its channel.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::calculation::{VisibilityWindow, WindowGeometry, solar_times};
use crate::sun::{SunData, SunTimes};

#[derive(Debug, Clone, PartialEq)]
pub struct SolarDay {
    pub date: NaiveDate,
    pub sun_times: SunTimes,
    pub visibility: VisibilityWindow,
}

impl SolarDay {
    pub fn compute(sun: &SunData, window: &WindowGeometry, date: NaiveDate) -> Result<Self> {
        let sun_times = sun
            .sun_times(date)
            .with_context(|| format!("Failed to calculate sunrise and sunset for {date}"))?;
        let samples = sun
            .day_samples(date)
            .with_context(|| format!("Failed to sample the sun path for {date}"))?;

        Ok(Self {
            date,
            sun_times,
            visibility: solar_times(window, &samples),
        })
    }
}

/// Solar days keyed by local date. Only the current and following days are kept.
#[derive(Debug, Clone, Default)]
pub struct SolarDayCache {
    days: BTreeMap<NaiveDate, SolarDay>,
}

impl SolarDayCache {
    pub fn get(&self, date: NaiveDate) -> Option<&SolarDay> {
        self.days.get(&date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    pub fn insert(&mut self, day: SolarDay) {
        self.days.insert(day.date, day);
    }

    /// Drop days before `today`.
    pub fn prune(&mut self, today: NaiveDate) {
        self.days.retain(|date, _| *date >= today);
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
