//! Runtime switches of a cover group.
//!
//! These are the values the presentation switches write through to. Everything that
//! the configuration cannot back is rejected here, so the refresh path never has to
//! second-guess a toggle.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::calculation::ClimateSwitches;
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuntimeToggles {
    climate_mode: bool,
    prefer_outside_temp: bool,
    automatic_control: bool,
    respect_manual: bool,
    lux_enabled: bool,
    irradiance_enabled: bool,
}

impl RuntimeToggles {
    /// Initial toggle states derived from the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            climate_mode: config.climate.enabled && config.climate_configured(),
            prefer_outside_temp: config.climate.prefer_outside_temp
                && has_outside_source(config),
            automatic_control: true,
            respect_manual: true,
            lux_enabled: config.climate.lux_entity.is_some(),
            irradiance_enabled: config.climate.irradiance_entity.is_some(),
        }
    }

    pub fn climate_mode(&self) -> bool {
        self.climate_mode
    }

    pub fn prefer_outside_temp(&self) -> bool {
        self.prefer_outside_temp
    }

    pub fn automatic_control(&self) -> bool {
        self.automatic_control
    }

    pub fn respect_manual(&self) -> bool {
        self.respect_manual
    }

    pub fn lux_enabled(&self) -> bool {
        self.lux_enabled
    }

    pub fn irradiance_enabled(&self) -> bool {
        self.irradiance_enabled
    }

    pub fn set_climate_mode(&mut self, enabled: bool, config: &Config) -> Result<()> {
        if enabled && !config.climate_configured() {
            bail!("Climate mode needs a temperature entity in [climate]");
        }
        self.climate_mode = enabled;
        Ok(())
    }

    pub fn set_prefer_outside_temp(&mut self, enabled: bool, config: &Config) -> Result<()> {
        if enabled && !has_outside_source(config) {
            bail!("Preferring the outside temperature needs an outside temperature or weather entity");
        }
        self.prefer_outside_temp = enabled;
        Ok(())
    }

    pub fn set_automatic_control(&mut self, enabled: bool) {
        self.automatic_control = enabled;
    }

    /// The caller is responsible for clearing manual state when this is turned off.
    pub fn set_respect_manual(&mut self, enabled: bool) {
        self.respect_manual = enabled;
    }

    pub fn set_lux_enabled(&mut self, enabled: bool, config: &Config) -> Result<()> {
        if enabled && config.climate.lux_entity.is_none() {
            bail!("The lux overlay needs a lux entity in [climate]");
        }
        self.lux_enabled = enabled;
        Ok(())
    }

    pub fn set_irradiance_enabled(&mut self, enabled: bool, config: &Config) -> Result<()> {
        if enabled && config.climate.irradiance_entity.is_none() {
            bail!("The irradiance overlay needs an irradiance entity in [climate]");
        }
        self.irradiance_enabled = enabled;
        Ok(())
    }

    /// The subset of toggles the climate overlay reads.
    pub fn climate_switches(&self) -> ClimateSwitches {
        ClimateSwitches {
            prefer_outside_temp: self.prefer_outside_temp,
            lux_enabled: self.lux_enabled,
            irradiance_enabled: self.irradiance_enabled,
        }
    }
}

fn has_outside_source(config: &Config) -> bool {
    config.climate.outside_temp_entity.is_some() || config.climate.weather_entity.is_some()
}
