//! General help and version output.

/// Display the version header.
pub fn display_version_info() {
    log_version!();
    log_end!();
}

/// Display general usage and the available commands.
pub fn display_help() {
    log_version!();
    log_block_start!("Usage: adaptive-cover [OPTIONS] <COMMAND>");
    log_block_start!("Commands:");
    log_indented!("check, c                      Validate the configuration and show the");
    log_indented!("                              position for the current time");
    log_indented!("help, h [COMMAND]             Show detailed help for a command");
    log_indented!("simulate, S <from> <to> [step] Run the automation over simulated time");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>  Use a custom configuration directory");
    log_indented!("-d, --debug         Show detailed evaluation output");
    log_indented!("-h, --help          Print help information");
    log_indented!("-l, --log <file>    Write simulation output to a file");
    log_indented!("-V, --version       Print version information");
    log_end!();
}

/// Display detailed help for one command.
pub fn run_help_command(command: &str) {
    match command {
        "check" | "c" => super::check::display_help(),
        "simulate" | "S" => super::simulate::display_help(),
        unknown => {
            log_warning!("Unknown command: {}", unknown);
            display_help();
        }
    }
}
