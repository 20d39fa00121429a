//! Help command implementation for earthpaper.
//!
//! Shows command-specific help or the command overview.

/// Show brief usage for a command (used for error messages)
pub fn show_command_usage(command: &str) {
    match command {
        "fetch" => log_block_start!("Usage: earthpaper fetch [--config <dir>]"),
        "render" => log_block_start!("Usage: earthpaper render --output <file> [OPTIONS]"),
        "status" => log_block_start!("Usage: earthpaper status [--json]"),
        "prepare-night" => {
            log_block_start!("Usage: earthpaper prepare-night <input> <output> [--size <n>]")
        }
        _ => log_block_start!("Usage: earthpaper [OPTIONS] [COMMAND]"),
    }
}

/// Run the help command (dispatcher)
pub fn run_help_command(command: Option<&str>) {
    match command {
        None => display_general_help(),
        Some("run") => display_run_help(),
        Some("fetch") => display_fetch_help(),
        Some("render") => display_render_help(),
        Some("status") => display_status_help(),
        Some("prepare-night") => display_prepare_night_help(),
        Some(unknown) => {
            log_warning!("Unknown command: {unknown}");
            display_general_help();
        }
    }
}

fn display_general_help() {
    log_version!();
    log_block_start!("Available Commands:");
    log_indented!("run                     Run the acquisition daemon (default)");
    log_indented!("fetch                   Run one acquisition cycle and exit");
    log_indented!("render                  Render a wallpaper from the cache");
    log_indented!("status                  Report the current bucket");
    log_indented!("prepare-night           Limb-darken a night-lights image");
    log_pipe!();
    log_info!("Use 'earthpaper help <command>' to see detailed help for a specific command.");
    log_indented!("Use 'earthpaper --help' to see all options and general usage.");
    log_end!();
}

fn display_run_help() {
    log_version!();
    log_block_start!("Usage: earthpaper [run] [--debug] [--config <dir>] [--log <file>]");
    log_block_start!("Runs an acquisition cycle at startup and then every `interval` minutes,");
    log_indented!("offset by `phase` minutes. Only one daemon may use a cache directory.");
    log_block_start!("Signals:");
    log_indented!("SIGUSR1                 Run a cycle now");
    log_indented!("SIGINT, SIGTERM, SIGHUP Stop after the current step");
    log_end!();
}

fn display_fetch_help() {
    log_version!();
    show_command_usage("fetch");
    log_block_start!("Runs a single acquisition cycle for the newest bucket and exits.");
    log_indented!("Exits 0 when the bucket is published or already fresh, 1 otherwise.");
    log_end!();
}

fn display_render_help() {
    log_version!();
    show_command_usage("render");
    log_block_start!("Options:");
    log_indented!("-o, --output <file>          PNG file to write");
    log_indented!("-r, --resolution <name>      Size preset: 4K, WQHD, WUXGA, HD or FHD");
    log_indented!("--width <n>, --height <n>    Size in pixels, above 512 and at most 4096");
    log_indented!("--zoom <f>                   Earth diameter relative to the short side (0-1)");
    log_indented!("--fov <deg>                  Star field of view in degrees (30-180)");
    log_indented!("--stars <f>                  Star intensity (0-1)");
    log_indented!("--constellations <f>         Constellation line opacity (0-1)");
    log_indented!("--tz-offset <minutes>        Your UTC offset in minutes (-840 to 840)");
    log_indented!("--timezone <name>            Your IANA timezone, e.g. Europe/Berlin");
    log_indented!("--at \"YYYY-MM-DD HH:MM\"      Render as of a UTC instant");
    log_block_start!("Exit codes:");
    log_indented!("0                            Wallpaper written");
    log_indented!("1                            Invalid parameters or error");
    log_indented!("2                            No current image in the cache");
    log_end!();
}

fn display_status_help() {
    log_version!();
    show_command_usage("status");
    log_block_start!("Shows the bucket the daemon is targeting, whether its image is fresh");
    log_indented!("and whether a daemon holds the cache lock.");
    log_end!();
}

fn display_prepare_night_help() {
    log_version!();
    show_command_usage("prepare-night");
    log_block_start!("Darkens a night-lights raster towards the limb, scales it by its own");
    log_indented!("brightness and resizes it to the canonical size (or --size).");
    log_indented!("Point `night_background` in earthpaper.toml at the output.");
    log_end!();
}
