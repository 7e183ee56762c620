//! Command-line argument parsing and processing.
//!
//! Supports the `check` and `simulate` commands plus the standard help, version,
//! debug and config directory flags. Flags may appear anywhere on the line.

use crate::constants::DEFAULT_SIMULATION_STEP_MINUTES;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Validate the configuration and show the position for the current time
    Check {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Run the automation over a simulated time span
    Simulate {
        debug_enabled: bool,
        config_dir: Option<String>,
        start_time: String,
        end_time: String,
        step_minutes: u64,
        log_file: Option<String>,
    },

    /// Display detailed help for one command and exit
    ShowCommandHelp(String),
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first item is the program name and is skipped. Help and version flags
    /// take precedence over any command.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut unknown_arg_found = false;
        let mut config_dir: Option<String> = None;
        let mut log_file: Option<String> = None;
        let mut positional: Vec<String> = Vec::new();

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            let arg_str = &args_vec[i];
            match arg_str.as_str() {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--config" | "-c" => {
                    // Parse: --config <directory>
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        config_dir = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing directory for --config. Usage: --config <directory>");
                        unknown_arg_found = true;
                    }
                }
                "--log" | "-l" => {
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        log_file = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing file for --log. Usage: --log <file>");
                        unknown_arg_found = true;
                    }
                }
                _ if arg_str.starts_with('-') => {
                    log_warning!("Unknown argument: {}", arg_str);
                    unknown_arg_found = true;
                }
                _ => positional.push(arg_str.clone()),
            }
            i += 1;
        }

        if display_version {
            return ParsedArgs {
                action: CliAction::ShowVersion,
            };
        }
        if display_help {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        }
        if unknown_arg_found {
            return ParsedArgs {
                action: CliAction::ShowHelpDueToError,
            };
        }

        let Some((command, rest)) = positional.split_first() else {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        };

        let action = match command.as_str() {
            "check" | "c" => {
                if let Some(extra) = rest.first() {
                    log_warning!("Unexpected argument for check: {}", extra);
                    CliAction::ShowHelpDueToError
                } else {
                    CliAction::Check {
                        debug_enabled,
                        config_dir,
                    }
                }
            }
            "help" | "h" => match rest.first() {
                Some(topic) => CliAction::ShowCommandHelp(topic.clone()),
                None => CliAction::ShowHelp,
            },
            "simulate" | "S" => parse_simulate(rest, debug_enabled, config_dir, log_file),
            _ => {
                log_warning!("Unknown command: {}", command);
                CliAction::ShowHelpDueToError
            }
        };

        ParsedArgs { action }
    }
}

/// Parse: simulate <from> <to> [step_minutes]
fn parse_simulate(
    rest: &[String],
    debug_enabled: bool,
    config_dir: Option<String>,
    log_file: Option<String>,
) -> CliAction {
    let (start_time, end_time, step) = match rest {
        [start, end] => (start, end, None),
        [start, end, step] => (start, end, Some(step)),
        _ => {
            log_warning!(
                "Usage: adaptive-cover simulate \"<from>\" \"<to>\" [step_minutes] [--log <file>]"
            );
            return CliAction::ShowHelpDueToError;
        }
    };

    let step_minutes = match step {
        None => DEFAULT_SIMULATION_STEP_MINUTES,
        Some(value) => match value.parse::<u64>() {
            Ok(minutes) if minutes > 0 => minutes,
            _ => {
                log_warning!("Invalid step: {} (expected whole minutes above 0)", value);
                return CliAction::ShowHelpDueToError;
            }
        },
    };

    CliAction::Simulate {
        debug_enabled,
        config_dir,
        start_time: start_time.clone(),
        end_time: end_time.clone(),
        step_minutes,
        log_file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args() {
        let args = vec!["adaptive-cover"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(parsed.action, CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_check_command() {
        let args = vec!["adaptive-cover", "check"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(
            parsed.action,
            CliAction::Check {
                debug_enabled: false,
                config_dir: None,
            }
        );
    }

    #[test]
    fn test_parse_check_with_flags_anywhere() {
        let args = vec!["adaptive-cover", "-d", "check", "--config", "/tmp/covers"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(
            parsed.action,
            CliAction::Check {
                debug_enabled: true,
                config_dir: Some("/tmp/covers".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_help_flag() {
        let args = vec!["adaptive-cover", "--help"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(parsed.action, CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_version_short_flags() {
        let args1 = vec!["adaptive-cover", "-V"];
        let parsed1 = ParsedArgs::parse(args1);
        assert_eq!(parsed1.action, CliAction::ShowVersion);

        let args2 = vec!["adaptive-cover", "-v", "check"];
        let parsed2 = ParsedArgs::parse(args2);
        assert_eq!(parsed2.action, CliAction::ShowVersion);
    }

    #[test]
    fn test_parse_multiple_flags() {
        let args = vec!["adaptive-cover", "--debug", "--help", "check"];
        let parsed = ParsedArgs::parse(args);
        // Help takes precedence
        assert_eq!(parsed.action, CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_unknown_flag() {
        let args = vec!["adaptive-cover", "--unknown", "check"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_help_command() {
        let args = vec!["adaptive-cover", "help", "simulate"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(
            parsed.action,
            CliAction::ShowCommandHelp("simulate".to_string())
        );

        let args = vec!["adaptive-cover", "h"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(parsed.action, CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_unknown_command() {
        let args = vec!["adaptive-cover", "open-everything"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_config_missing_directory() {
        let args = vec!["adaptive-cover", "check", "--config"];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_simulate_defaults() {
        let args = vec![
            "adaptive-cover",
            "simulate",
            "2024-06-21 06:00:00",
            "2024-06-21 22:00:00",
        ];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(
            parsed.action,
            CliAction::Simulate {
                debug_enabled: false,
                config_dir: None,
                start_time: "2024-06-21 06:00:00".to_string(),
                end_time: "2024-06-21 22:00:00".to_string(),
                step_minutes: DEFAULT_SIMULATION_STEP_MINUTES,
                log_file: None,
            }
        );
    }

    #[test]
    fn test_parse_simulate_with_step_and_log() {
        let args = vec![
            "adaptive-cover",
            "S",
            "2024-06-21 06:00:00",
            "2024-06-21 22:00:00",
            "15",
            "--log",
            "simulation.log",
        ];
        let parsed = ParsedArgs::parse(args);
        assert_eq!(
            parsed.action,
            CliAction::Simulate {
                debug_enabled: false,
                config_dir: None,
                start_time: "2024-06-21 06:00:00".to_string(),
                end_time: "2024-06-21 22:00:00".to_string(),
                step_minutes: 15,
                log_file: Some("simulation.log".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_simulate_invalid_arguments() {
        let missing_end = vec!["adaptive-cover", "simulate", "2024-06-21 06:00:00"];
        assert_eq!(
            ParsedArgs::parse(missing_end).action,
            CliAction::ShowHelpDueToError
        );

        let zero_step = vec![
            "adaptive-cover",
            "simulate",
            "2024-06-21 06:00:00",
            "2024-06-21 22:00:00",
            "0",
        ];
        assert_eq!(
            ParsedArgs::parse(zero_step).action,
            CliAction::ShowHelpDueToError
        );
    }
}
