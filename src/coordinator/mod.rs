//! Refresh coordinator of one cover group.
//!
//! The coordinator owns all mutable state of a group: runtime toggles, manual
//! override records, pending targets, the per-device rate limit, and the solar-day
//! cache. The host feeds it entity changes and calls [`Coordinator::refresh`]; each
//! refresh recomputes the position and decides per device whether to command it.
//!
//! Per device the gates are evaluated in this order:
//!
//! 1. automatic control is switched off
//! 2. outside the active time window
//! 3. under manual control
//! 4. position change below `delta_position` (bypassed for special positions)
//! 5. last command less than `delta_time` ago
//!
//! Gates 4 and 5 are skipped on the first refresh after start.
//!
//! Every command records a [`PendingTarget`]. Until the device reports that target,
//! its state changes are not evaluated for manual override, so the automation never
//! mistakes its own movement for a human one.

pub mod event_loop;
pub mod scheduler;
pub mod solar_day;
pub mod window;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::calculation::{ClimateReadings, PresenceReading, WindowGeometry};
use crate::config::{Config, CoverType};
use crate::constants::{ATTR_CURRENT_TEMPERATURE, ATTR_TEMPERATURE, SUN_ENTITY};
use crate::host::{
    CoverService, HostRuntime, ServiceCall, get_domain, numeric_attribute, numeric_state,
    position_attribute, safe_state,
};
use crate::logger::Log;
use crate::manager::{CoverStateChange, DetectionContext, ManualOverrideManager};
use crate::policy::{CoverState, PolicyInputs, PositionPolicy};
use crate::sun::{SolarSample, SunData};
use crate::toggles::RuntimeToggles;

pub use event_loop::{CoordinatorEvent, EventLoop, ToggleChange};
pub use scheduler::Scheduler;
pub use solar_day::{SolarDay, SolarDayCache};
pub use window::TimeWindow;

/// Parameters for creating a Coordinator.
pub struct CoordinatorParams {
    pub config: Config,
    pub debug_enabled: bool,
}

/// Last command sent to a device and whether it has landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingTarget {
    pub target: u8,
    pub waiting: bool,
}

/// A cover report together with the pending target at the moment it arrived.
struct QueuedChange {
    change: CoverStateChange,
    pending: Option<PendingTarget>,
}

/// Why a device was not commanded during a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ControlDisabled,
    OutsideTimeWindow,
    ManualOverride,
    BelowMinimumChange,
    RateLimited,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ControlDisabled => "automatic control is off",
            SkipReason::OutsideTimeWindow => "outside the active time window",
            SkipReason::ManualOverride => "under manual control",
            SkipReason::BelowMinimumChange => "change below the minimum",
            SkipReason::RateLimited => "commanded too recently",
        }
    }
}

pub struct Coordinator {
    config: Config,
    debug_enabled: bool,
    sun: SunData,
    window: WindowGeometry,
    toggles: RuntimeToggles,
    manager: ManualOverrideManager,
    pending: BTreeMap<String, PendingTarget>,
    last_command: BTreeMap<String, DateTime<Utc>>,
    solar_days: SolarDayCache,
    queued_changes: Vec<QueuedChange>,
    state: Option<CoverState>,
    first_refresh: bool,
    inverted_window: bool,
}

impl Coordinator {
    pub fn new(params: CoordinatorParams) -> Self {
        let config = params.config;
        let manager = ManualOverrideManager::new(
            config.entities.iter().cloned(),
            Duration::minutes(config.automation.manual_override_duration),
        );

        Self {
            sun: SunData::from_config(&config),
            window: WindowGeometry::from_config(&config),
            toggles: RuntimeToggles::from_config(&config),
            debug_enabled: params.debug_enabled,
            manager,
            pending: BTreeMap::new(),
            last_command: BTreeMap::new(),
            solar_days: SolarDayCache::default(),
            queued_changes: Vec::new(),
            state: None,
            first_refresh: true,
            inverted_window: false,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    pub fn sun_data(&self) -> &SunData {
        &self.sun
    }

    pub fn window_geometry(&self) -> &WindowGeometry {
        &self.window
    }

    /// Result of the last refresh.
    pub fn state(&self) -> Option<&CoverState> {
        self.state.as_ref()
    }

    pub fn toggles(&self) -> &RuntimeToggles {
        &self.toggles
    }

    pub fn manager(&self) -> &ManualOverrideManager {
        &self.manager
    }

    pub fn pending_target(&self, entity_id: &str) -> Option<PendingTarget> {
        self.pending.get(entity_id).copied()
    }

    pub fn is_manual_override_active(&self) -> bool {
        self.manager.any_manual()
    }

    pub fn manual_entities(&self) -> Vec<String> {
        self.manager.manual_entities()
    }

    /// Cover entities of the group.
    pub fn cover_entities(&self) -> &[String] {
        &self.config.entities
    }

    /// Input entities whose changes should trigger a refresh.
    pub fn tracked_entities(&self) -> Vec<String> {
        let climate = &self.config.climate;
        let automation = &self.config.automation;
        std::iter::once(Some(SUN_ENTITY.to_string()))
            .chain([
                climate.temp_entity.clone(),
                climate.outside_temp_entity.clone(),
                climate.presence_entity.clone(),
                climate.weather_entity.clone(),
                climate.lux_entity.clone(),
                climate.irradiance_entity.clone(),
                automation.start_entity.clone(),
                automation.end_entity.clone(),
            ])
            .flatten()
            .collect()
    }

    // # Toggles

    pub fn set_climate_mode(&mut self, enabled: bool) -> Result<()> {
        self.toggles.set_climate_mode(enabled, &self.config)
    }

    pub fn set_prefer_outside_temp(&mut self, enabled: bool) -> Result<()> {
        self.toggles.set_prefer_outside_temp(enabled, &self.config)
    }

    pub fn set_automatic_control(&mut self, enabled: bool) {
        self.toggles.set_automatic_control(enabled);
    }

    /// Turning this off releases every cover from manual control.
    pub fn set_respect_manual(&mut self, enabled: bool) {
        self.toggles.set_respect_manual(enabled);
        if !enabled {
            self.manager.reset_all();
            self.queued_changes.clear();
        }
    }

    pub fn set_lux_enabled(&mut self, enabled: bool) -> Result<()> {
        self.toggles.set_lux_enabled(enabled, &self.config)
    }

    pub fn set_irradiance_enabled(&mut self, enabled: bool) -> Result<()> {
        self.toggles.set_irradiance_enabled(enabled, &self.config)
    }

    pub fn apply_toggle(&mut self, change: ToggleChange) -> Result<()> {
        match change {
            ToggleChange::ClimateMode(enabled) => self.set_climate_mode(enabled),
            ToggleChange::PreferOutsideTemp(enabled) => self.set_prefer_outside_temp(enabled),
            ToggleChange::AutomaticControl(enabled) => {
                self.set_automatic_control(enabled);
                Ok(())
            }
            ToggleChange::RespectManual(enabled) => {
                self.set_respect_manual(enabled);
                Ok(())
            }
            ToggleChange::Lux(enabled) => self.set_lux_enabled(enabled),
            ToggleChange::Irradiance(enabled) => self.set_irradiance_enabled(enabled),
        }
    }

    // # Host events

    /// Record a state change reported by one of the group's covers.
    ///
    /// A report of the pending target clears the waiting flag. The change itself is
    /// evaluated for manual override on the next refresh, against the pending target
    /// as it stood when the report arrived.
    pub fn handle_cover_state_change(&mut self, change: CoverStateChange) {
        if !self.config.entities.contains(&change.entity_id) {
            return;
        }

        let snapshot = self.pending.get(&change.entity_id).copied();
        if let Some(pending) = self.pending.get_mut(&change.entity_id)
            && pending.waiting
            && change.position == Some(f64::from(pending.target))
        {
            pending.waiting = false;
            if self.debug_enabled {
                let _scope = Log::scope(&self.config.name);
                log_debug!("{} reached target {}%", change.entity_id, pending.target);
            }
        }

        self.queued_changes.push(QueuedChange {
            change,
            pending: snapshot,
        });
    }

    // # Solar days

    /// Next local date whose solar data is not cached yet, if any.
    pub fn missing_solar_day(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let today = self.sun.local_date(now);
        [Some(today), today.succ_opt()]
            .into_iter()
            .flatten()
            .find(|date| !self.solar_days.contains(*date))
    }

    pub fn install_solar_day(&mut self, day: SolarDay) {
        self.solar_days.insert(day);
    }

    fn solar_day(&mut self, now: DateTime<Utc>) -> Result<SolarDay> {
        let today = self.sun.local_date(now);
        self.solar_days.prune(today);
        if let Some(day) = self.solar_days.get(today) {
            return Ok(day.clone());
        }

        let day = SolarDay::compute(&self.sun, &self.window, today)?;
        if self.debug_enabled {
            log_debug!(
                "Solar window for {today}: {} to {}",
                format_instant(day.visibility.start),
                format_instant(day.visibility.end)
            );
        }
        self.solar_days.insert(day.clone());
        Ok(day)
    }

    // # Inputs

    fn solar_sample(&self, host: &dyn HostRuntime, now: DateTime<Utc>) -> Result<SolarSample> {
        let azimuth = numeric_attribute(host, SUN_ENTITY, "azimuth");
        let elevation = numeric_attribute(host, SUN_ENTITY, "elevation");
        match (azimuth, elevation) {
            (Some(azimuth), Some(elevation)) => Ok(SolarSample { azimuth, elevation }),
            _ => self.sun.position_at(now),
        }
    }

    fn climate_readings(&self, host: &dyn HostRuntime) -> ClimateReadings {
        let climate = &self.config.climate;

        let inside_temperature = climate.temp_entity.as_deref().and_then(|entity| {
            if get_domain(entity) == Some("climate") {
                numeric_attribute(host, entity, ATTR_CURRENT_TEMPERATURE)
            } else {
                numeric_state(host, entity)
            }
        });

        let outside_temperature = match (&climate.outside_temp_entity, &climate.weather_entity) {
            (Some(entity), _) => numeric_state(host, entity),
            (None, Some(weather)) => numeric_attribute(host, weather, ATTR_TEMPERATURE),
            (None, None) => None,
        };

        let presence = climate.presence_entity.as_deref().and_then(|entity| {
            Some(PresenceReading {
                domain: get_domain(entity)?.to_string(),
                state: safe_state(host, entity)?,
            })
        });

        ClimateReadings {
            inside_temperature,
            outside_temperature,
            presence,
            weather_state: climate
                .weather_entity
                .as_deref()
                .and_then(|entity| safe_state(host, entity)),
            lux: climate
                .lux_entity
                .as_deref()
                .and_then(|entity| numeric_state(host, entity)),
            irradiance: climate
                .irradiance_entity
                .as_deref()
                .and_then(|entity| numeric_state(host, entity)),
        }
    }

    fn service(&self) -> CoverService {
        match self.config.cover_type {
            CoverType::Tilt => CoverService::SetCoverTiltPosition,
            CoverType::Vertical | CoverType::Awning => CoverService::SetCoverPosition,
        }
    }

    // # Refresh

    /// Run one refresh cycle: recompute, reconcile manual overrides, command devices.
    pub fn refresh(&mut self, host: &mut dyn HostRuntime, now: DateTime<Utc>) -> Result<CoverState> {
        let name = self.config.name.clone();
        let _scope = Log::scope(&name);

        let day = self.solar_day(now)?;
        let sample = self.solar_sample(host, now)?;
        let readings = self.climate_readings(host);

        let state = PositionPolicy::new(&self.config).evaluate(PolicyInputs {
            sample,
            sun_times: day.sun_times,
            visibility: day.visibility,
            readings: &readings,
            toggles: &self.toggles,
            now,
        });

        if self.debug_enabled {
            log_debug!(
                "Sun {:.1}°/{:.1}°, {} position {}% (default {}%, climate {:?})",
                sample.azimuth,
                sample.elevation,
                state.control_method.as_str(),
                state.final_position,
                state.default_position,
                state.climate_position
            );
        }

        self.reconcile_manual_overrides(&state, now);

        let time_window = TimeWindow::resolve(&self.config, host, now);
        self.note_time_window(&time_window);
        for entity in self.config.entities.clone() {
            match self.check_gates(host, &entity, &state, &time_window, now) {
                Ok(()) => self.command(host, &entity, state.final_position, now),
                Err(reason) => {
                    if self.debug_enabled {
                        log_debug!("Not moving {entity}: {}", reason.as_str());
                    }
                }
            }
        }

        self.first_refresh = false;
        self.state = Some(state.clone());
        Ok(state)
    }

    fn reconcile_manual_overrides(&mut self, state: &CoverState, now: DateTime<Utc>) {
        let changes = std::mem::take(&mut self.queued_changes);

        if self.toggles.respect_manual() {
            let automation = &self.config.automation;
            for QueuedChange { change, pending } in &changes {
                let context = DetectionContext {
                    expected: f64::from(
                        pending.map_or(state.final_position, |pending| pending.target),
                    ),
                    waiting: pending.is_some_and(|pending| pending.waiting),
                    threshold: automation.manual_threshold,
                    ignore_intermediate: automation.manual_ignore_intermediate,
                    renew_on_change: automation.manual_override_reset,
                };

                let was_manual = self.manager.is_manual(&change.entity_id);
                if self.manager.handle_state_change(change, context) && !was_manual {
                    log_info!(
                        "{} moved to {:?}% by hand, pausing automatic control",
                        change.entity_id,
                        change.position
                    );
                }
            }
        }

        for entity in self.manager.reset_if_needed(now) {
            log_info!(
                "Manual override of {entity} expired after {} minutes",
                self.manager.reset_duration().num_minutes()
            );
        }
    }

    /// Log an inverted time window once, when it appears. Returns whether it logged.
    fn note_time_window(&mut self, window: &TimeWindow) -> bool {
        let inverted = window.is_inverted();
        let newly_inverted = inverted && !self.inverted_window;
        self.inverted_window = inverted;

        if let (true, Some(start), Some(end)) = (newly_inverted, window.start, window.end) {
            log_error!(
                "Start time {} is after end time {}, ignoring the time window",
                start.format("%H:%M:%S"),
                end.format("%H:%M:%S")
            );
        }
        newly_inverted
    }

    fn check_gates(
        &self,
        host: &dyn HostRuntime,
        entity: &str,
        state: &CoverState,
        time_window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<(), SkipReason> {
        if !self.toggles.automatic_control() {
            return Err(SkipReason::ControlDisabled);
        }
        if !time_window.contains(now) {
            return Err(SkipReason::OutsideTimeWindow);
        }
        if self.manager.is_manual(entity) {
            return Err(SkipReason::ManualOverride);
        }
        if self.first_refresh {
            return Ok(());
        }

        let target = state.final_position;
        let attribute = position_attribute(self.config.cover_type);
        if let Some(current) = numeric_attribute(host, entity, attribute) {
            let delta = (f64::from(target) - current).abs();
            let special = delta > 0.0 && PositionPolicy::new(&self.config).is_special_position(target);
            if delta < f64::from(self.config.automation.delta_position) && !special {
                return Err(SkipReason::BelowMinimumChange);
            }
        }

        if let Some(last) = self.last_command.get(entity)
            && now - *last < Duration::minutes(self.config.automation.delta_time)
        {
            return Err(SkipReason::RateLimited);
        }

        Ok(())
    }

    /// Send one position to one device and record it as pending.
    ///
    /// A failed dispatch is logged and leaves the pending target in place.
    fn command(&mut self, host: &mut dyn HostRuntime, entity: &str, position: u8, now: DateTime<Utc>) {
        self.pending.insert(
            entity.to_string(),
            PendingTarget {
                target: position,
                waiting: true,
            },
        );
        self.last_command.insert(entity.to_string(), now);

        let call = ServiceCall {
            service: self.service(),
            entity_id: entity.to_string(),
            position,
        };
        match host.call_service(&call) {
            Ok(()) => log_info!("Moving {entity} to {position}%"),
            Err(e) => log_error!("Failed to move {entity} to {position}%: {e}"),
        }
    }

    // # Actions

    /// Re-apply the computed position to every manually controlled cover and hand
    /// it back to automatic control. Covers that are not manual are left alone.
    pub fn reset_manual_override(&mut self, host: &mut dyn HostRuntime, now: DateTime<Utc>) -> Result<()> {
        let position = match &self.state {
            Some(state) => state.final_position,
            None => self.refresh(host, now)?.final_position,
        };

        let name = self.config.name.clone();
        let _scope = Log::scope(&name);

        let manual = self.manager.manual_entities();
        if manual.is_empty() {
            log_info!("No cover is under manual control, nothing to reset");
            return Ok(());
        }
        log_info!("Resetting manual override of {}", manual.join(", "));

        for entity in &manual {
            self.last_command.remove(entity);
            self.command(host, entity, position, now);
            self.manager.reset(entity);
        }
        self.queued_changes
            .retain(|queued| !manual.contains(&queued.change.entity_id));
        Ok(())
    }

    /// When the return-to-sunset timer should fire next, if at all.
    pub fn sunset_deadline(&self, host: &dyn HostRuntime, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.config.automation.return_sunset {
            return None;
        }
        TimeWindow::resolve(&self.config, host, now)
            .end
            .filter(|end| *end > now)
    }

    /// Move every automatically controlled cover to the sunset position.
    pub fn return_to_sunset(&mut self, host: &mut dyn HostRuntime, now: DateTime<Utc>) {
        let name = self.config.name.clone();
        let _scope = Log::scope(&name);

        if !self.toggles.automatic_control() {
            if self.debug_enabled {
                log_debug!("End time reached but automatic control is off");
            }
            return;
        }

        let position = PositionPolicy::new(&self.config).sunset_target();
        log_info!("End time reached, returning to the sunset position");
        for entity in self.config.entities.clone() {
            if self.manager.is_manual(&entity) {
                if self.debug_enabled {
                    log_debug!("Not moving {entity}: {}", SkipReason::ManualOverride.as_str());
                }
                continue;
            }
            self.command(host, &entity, position, now);
        }
    }

    /// Snapshot of the coordinator for troubleshooting.
    pub fn diagnostics(&self) -> Value {
        json!({
            "config": self.config,
            "toggles": self.toggles,
            "state": self.state,
            "manual_override": self.manager.records(),
            "pending_targets": self.pending,
            "last_commands": self.last_command,
            "first_refresh": self.first_refresh,
        })
    }
}

fn format_instant(instant: Option<DateTime<Utc>>) -> String {
    instant
        .map(|value| value.format("%H:%M UTC").to_string())
        .unwrap_or_else(|| "none".to_string())
}
