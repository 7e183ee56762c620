//! Binary entry point: argument parsing and command dispatch.
//!
//! All functionality lives in the `adaptive_cover` library; this file only maps a
//! parsed [`CliAction`] onto the matching command handler and turns errors into a
//! non-zero exit code.

use adaptive_cover::args::{CliAction, ParsedArgs};
use adaptive_cover::commands::{check, help, simulate};
use adaptive_cover::config;
use adaptive_cover::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use adaptive_cover::log_error_exit;
use anyhow::Result;

fn main() {
    let parsed_args = ParsedArgs::parse(std::env::args());

    let code = match run(parsed_args.action) {
        Ok(code) => code,
        Err(e) => {
            log_error_exit!("{:#}", e);
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}

fn run(action: CliAction) -> Result<i32> {
    match action {
        CliAction::ShowVersion => help::display_version_info(),
        CliAction::ShowHelp => help::display_help(),
        CliAction::ShowCommandHelp(command) => help::run_help_command(&command),
        CliAction::ShowHelpDueToError => {
            help::display_help();
            return Ok(EXIT_FAILURE);
        }
        CliAction::Check {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            check::handle_check_command(debug_enabled)?;
        }
        CliAction::Simulate {
            debug_enabled,
            config_dir,
            start_time,
            end_time,
            step_minutes,
            log_file,
        } => {
            config::set_config_dir(config_dir)?;
            simulate::handle_simulate_command(simulate::SimulateParams {
                start_time,
                end_time,
                step_minutes,
                log_file,
                debug_enabled,
            })?;
        }
    }

    Ok(EXIT_SUCCESS)
}
