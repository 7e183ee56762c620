//! Implementation of the `check` command.
//!
//! Loads and validates the configuration, then evaluates the position the covers
//! would be given right now. Nothing is sent to any device: the evaluation runs
//! against an empty in-memory host, so the sun position comes from the local solar
//! calculation and the climate inputs read as missing.

use anyhow::{Context, Result};

use crate::config;
use crate::coordinator::{Coordinator, CoordinatorParams};
use crate::time_source;

use super::simulate::SimulatedHost;

/// Handle the `check` command.
pub fn handle_check_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let config = config::load().context("Configuration check failed")?;
    config.log_config();

    let tz = config.timezone();
    let mut coordinator = Coordinator::new(CoordinatorParams {
        config,
        debug_enabled,
    });
    let mut host = SimulatedHost::new();
    let now = time_source::now();
    let state = coordinator.refresh(&mut host, now)?;

    log_block_start!(
        "Position at {}",
        now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z")
    );
    log_indented!(
        "Sun: azimuth {:.1}°, elevation {:.1}°",
        state.sun.azimuth,
        state.sun.elevation
    );
    log_indented!(
        "Sun in front of the window: {}",
        if state.sun_valid { "yes" } else { "no" }
    );
    if state.blind_spot_active {
        log_indented!("Sun is behind the blind spot");
    }
    match (state.visibility_window.start, state.visibility_window.end) {
        (Some(start), Some(end)) => log_indented!(
            "In front today from {} to {}",
            start.with_timezone(&tz).format("%H:%M"),
            end.with_timezone(&tz).format("%H:%M")
        ),
        _ => log_indented!("The sun does not pass in front of this window today"),
    }
    log_indented!(
        "Computed position: {}% ({} control, default {}%)",
        state.final_position,
        state.control_method.as_str(),
        state.default_position
    );
    if debug_enabled {
        log_pipe!();
        log_debug!("Coordinator state: {}", coordinator.diagnostics());
    }
    log_end!();

    Ok(())
}

/// Display help for the check command.
pub fn display_help() {
    log_version!();
    log_block_start!("check - Validate the configuration and show the current position");
    log_block_start!("Usage: adaptive-cover check [--config DIR] [--debug]");
    log_block_start!("Description:");
    log_indented!("Loads adaptive-cover.toml, reports any validation error and prints");
    log_indented!("the position the covers would be moved to at this moment.");
    log_indented!("No device is commanded.");
    log_end!();
}
