//! Binary entry point: parse arguments and dispatch.
//!
//! Every command returns its exit code; only this function terminates the
//! process.

use anyhow::Result;

use earthpaper::EarthPaper;
use earthpaper::args::{self, CliAction, ParsedArgs};
use earthpaper::commands;
use earthpaper::common::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use earthpaper::config;

fn main() {
    let code = match dispatch(ParsedArgs::from_env().action) {
        Ok(code) => code,
        Err(e) => {
            earthpaper::log_error_exit!("{e:#}");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

fn dispatch(action: CliAction) -> Result<i32> {
    match action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(EXIT_SUCCESS)
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(EXIT_SUCCESS)
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            Ok(EXIT_FAILURE)
        }
        CliAction::Help { command } => {
            commands::help::run_help_command(command.as_deref());
            Ok(EXIT_SUCCESS)
        }
        CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
        } => {
            config::set_config_dir(config_dir)?;
            EarthPaper::new(debug_enabled).with_log_file(log_file).run()?;
            Ok(EXIT_SUCCESS)
        }
        CliAction::Fetch {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::fetch::handle_fetch_command(debug_enabled)
        }
        CliAction::Render {
            debug_enabled,
            config_dir,
            args,
        } => {
            config::set_config_dir(config_dir)?;
            commands::render::handle_render_command(&args, debug_enabled)
        }
        CliAction::Status { config_dir, json } => {
            config::set_config_dir(config_dir)?;
            commands::status::handle_status_command(json)
        }
        CliAction::PrepareNight {
            input,
            output,
            size,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::prepare_night::handle_prepare_night_command(&input, &output, size)
        }
    }
}
