//! Implementation of the `simulate` command.
//!
//! Runs a coordinator against an in-memory host with the simulated time source in
//! fast-forward mode. The sun position is computed locally, covers move instantly
//! to whatever they are told and report the new position back, so a whole day of
//! commands can be reviewed in a second.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration as StdDuration;

use crate::config::{self, CoverType};
use crate::constants::{
    ATTR_CURRENT_POSITION, ATTR_CURRENT_TILT_POSITION, DEFAULT_SIMULATION_STEP_MINUTES,
};
use crate::coordinator::{Coordinator, CoordinatorEvent, CoordinatorParams, EventLoop};
use crate::host::{CoverService, HostRuntime, ServiceCall, position_attribute};
use crate::logger::Log;
use crate::manager::CoverStateChange;
use crate::time_source::{self, SimulatedTimeSource};

/// In-memory host runtime.
///
/// Holds entity states and attributes set by the caller and records every service
/// call. Commanded positions are written back to the cover's position attribute and,
/// when an event sender is attached, reported as a cover state change.
#[derive(Debug, Default)]
pub struct SimulatedHost {
    states: HashMap<String, String>,
    attributes: HashMap<String, Map<String, Value>>,
    calls: Vec<ServiceCall>,
    echo_positions: bool,
    events: Option<Sender<CoordinatorEvent>>,
    fail_calls: bool,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply commanded positions to the cover attributes.
    pub fn with_echo(mut self) -> Self {
        self.echo_positions = true;
        self
    }

    /// Report applied positions as state changes on `sender`.
    pub fn attach_events(&mut self, sender: Sender<CoordinatorEvent>) {
        self.echo_positions = true;
        self.events = Some(sender);
    }

    /// Make every service call fail.
    pub fn set_fail_calls(&mut self, fail: bool) {
        self.fail_calls = fail;
    }

    pub fn set_state(&mut self, entity_id: &str, state: &str) {
        self.states.insert(entity_id.to_string(), state.to_string());
    }

    pub fn remove_state(&mut self, entity_id: &str) {
        self.states.remove(entity_id);
    }

    pub fn set_attribute(&mut self, entity_id: &str, attribute: &str, value: impl Into<Value>) {
        self.attributes
            .entry(entity_id.to_string())
            .or_default()
            .insert(attribute.to_string(), value.into());
    }

    pub fn remove_attribute(&mut self, entity_id: &str, attribute: &str) {
        if let Some(attributes) = self.attributes.get_mut(entity_id) {
            attributes.remove(attribute);
        }
    }

    /// Set a cover's reported position (or tilt position).
    pub fn set_cover_position(&mut self, entity_id: &str, cover_type: CoverType, position: f64) {
        self.set_attribute(entity_id, position_attribute(cover_type), position);
    }

    pub fn calls(&self) -> &[ServiceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<ServiceCall> {
        std::mem::take(&mut self.calls)
    }

    fn echo(&mut self, call: &ServiceCall) {
        let attribute = match call.service {
            CoverService::SetCoverPosition => ATTR_CURRENT_POSITION,
            CoverService::SetCoverTiltPosition => ATTR_CURRENT_TILT_POSITION,
        };
        self.set_attribute(&call.entity_id, attribute, call.position);
        self.set_state(
            &call.entity_id,
            if call.position == 0 { "closed" } else { "open" },
        );

        if let Some(sender) = &self.events {
            let change = CoverStateChange {
                entity_id: call.entity_id.clone(),
                state: self.states.get(&call.entity_id).cloned(),
                position: Some(f64::from(call.position)),
                changed_at: time_source::now(),
            };
            let _ = sender.send(CoordinatorEvent::CoverChanged(change));
        }
    }
}

impl HostRuntime for SimulatedHost {
    fn state(&self, entity_id: &str) -> Option<String> {
        self.states.get(entity_id).cloned()
    }

    fn attribute(&self, entity_id: &str, attribute: &str) -> Option<Value> {
        self.attributes.get(entity_id)?.get(attribute).cloned()
    }

    fn call_service(&mut self, call: &ServiceCall) -> Result<()> {
        if self.fail_calls {
            bail!("Service {} rejected for {}", call.service.as_str(), call.entity_id);
        }
        self.calls.push(call.clone());
        if self.echo_positions {
            self.echo(call);
        }
        Ok(())
    }
}

/// Parameters of a simulation run.
pub struct SimulateParams {
    pub start_time: String,
    pub end_time: String,
    pub step_minutes: u64,
    pub log_file: Option<String>,
    pub debug_enabled: bool,
}

/// Handle the `simulate` command.
///
/// Times are wall-clock `YYYY-MM-DD HH:MM:SS` at the configured location.
pub fn handle_simulate_command(params: SimulateParams) -> Result<()> {
    let config = config::load().context("Failed to load configuration for the simulation")?;

    let tz = config.timezone();
    let start = time_source::parse_datetime_in_tz(&params.start_time, tz)
        .map_err(|e| anyhow::anyhow!("Invalid start time: {e}"))?;
    let end = time_source::parse_datetime_in_tz(&params.end_time, tz)
        .map_err(|e| anyhow::anyhow!("Invalid end time: {e}"))?;
    if end <= start {
        bail!("End time must be after start time");
    }
    if params.step_minutes == 0 {
        bail!("Simulation step must be at least one minute");
    }

    // The simulated clock must be in place before the first log line
    time_source::init_time_source(Arc::new(SimulatedTimeSource::new(start, end)));
    Log::set_location_timezone(Some(tz));

    let _log_guard = match &params.log_file {
        Some(path) => Some(
            Log::start_file_logging(path.clone())
                .with_context(|| format!("Failed to start logging to {path}"))?,
        ),
        None => None,
    };

    log_version!();
    log_block_start!("Simulation Mode");
    log_decorated!(
        "Simulating '{}' from {} to {}",
        config.name,
        params.start_time,
        params.end_time
    );
    let duration = end - start;
    log_indented!(
        "Total simulated time: {} hours {} minutes, refresh every {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60,
        params.step_minutes
    );
    config.log_config();

    let mut host = SimulatedHost::new();
    for entity in &config.entities {
        host.set_state(entity, "open");
        host.set_cover_position(entity, config.cover_type, 100.0);
    }

    let coordinator = Coordinator::new(CoordinatorParams {
        config,
        debug_enabled: params.debug_enabled,
    });
    let mut event_loop = EventLoop::new(coordinator, host)
        .with_refresh_interval(StdDuration::from_secs(params.step_minutes * 60));
    let sender = event_loop.sender();
    event_loop.host_mut().attach_events(sender);

    log_block_start!("Running simulation...");
    event_loop.run()?;

    let (coordinator, host) = event_loop.into_parts();
    log_block_start!("Simulation complete");
    log_indented!("Commands issued: {}", host.calls().len());
    if let Some(state) = coordinator.state() {
        log_indented!(
            "Final position: {}% ({})",
            state.final_position,
            state.control_method.as_str()
        );
        log_indented!(
            "Sun in front of the window: {} to {}",
            format_local(state.visibility_window.start, tz),
            format_local(state.visibility_window.end, tz)
        );
    }
    log_end!();

    Ok(())
}

fn format_local(instant: Option<DateTime<Utc>>, tz: chrono_tz::Tz) -> String {
    instant
        .map(|value| value.with_timezone(&tz).format("%H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// Display help for the simulate command.
pub fn display_help() {
    log_version!();
    log_block_start!("simulate - Run the automation against simulated time");
    log_block_start!(
        "Usage: adaptive-cover simulate \"YYYY-MM-DD HH:MM:SS\" \"YYYY-MM-DD HH:MM:SS\" [step_minutes] [--log FILE]"
    );
    log_block_start!("Arguments:");
    log_indented!("from          Start of the simulation, local time at the location");
    log_indented!("to            End of the simulation, local time at the location");
    log_indented!(
        "step_minutes  Minutes between periodic refreshes (default {})",
        DEFAULT_SIMULATION_STEP_MINUTES
    );
    log_block_start!("Options:");
    log_indented!("-l, --log FILE  Write the output to FILE instead of the terminal");
    log_end!();
}
