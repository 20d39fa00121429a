//! Command-line argument parsing and processing.
//!
//! Arguments are parsed by hand into a [`CliAction`]. Global options may
//! appear anywhere; the first positional argument selects the command and
//! `run` is implied when there is none.
//!
//! ```text
//! earthpaper [run] [--debug] [--config DIR] [--log FILE]
//! earthpaper fetch
//! earthpaper render --output FILE [--resolution NAME] [--width N] [--height N]
//!                   [--zoom F] [--fov F]
//!                   [--stars F] [--constellations F]
//!                   [--tz-offset MINUTES | --timezone NAME] [--at "YYYY-MM-DD HH:MM"]
//! earthpaper status [--json]
//! earthpaper prepare-night INPUT OUTPUT [--size N]
//! earthpaper help [COMMAND]
//! ```

use std::str::FromStr;

/// Wallpaper options of the `render` command, still unvalidated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderArgs {
    pub output: String,
    /// Size preset; `width` and `height` override its dimensions.
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub zoom: Option<f64>,
    pub fov: Option<f64>,
    pub stars: Option<f64>,
    pub constellations: Option<f64>,
    pub tz_offset: Option<i32>,
    pub timezone: Option<String>,
    /// Render as if it were this UTC instant.
    pub at: Option<String>,
}

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the acquisition daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
    },
    /// Run a single acquisition cycle and exit
    Fetch {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Render a wallpaper from the cache
    Render {
        debug_enabled: bool,
        config_dir: Option<String>,
        args: RenderArgs,
    },
    /// Report the state of the current bucket
    Status {
        config_dir: Option<String>,
        json: bool,
    },
    /// Prepare a night-lights background
    PrepareNight {
        input: String,
        output: String,
        size: Option<u32>,
        config_dir: Option<String>,
    },

    /// Detailed help for one command, or the command overview
    Help { command: Option<String> },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to invalid arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

/// Options shared by every command.
#[derive(Default)]
struct GlobalOptions {
    debug_enabled: bool,
    config_dir: Option<String>,
    log_file: Option<String>,
    help: bool,
    version: bool,
}

/// Command-specific options collected in one pass.
#[derive(Default)]
struct CommandOptions {
    positional: Vec<String>,
    render: RenderArgs,
    output_given: bool,
    json: bool,
    size: Option<u32>,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first item is the program name and is skipped.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let action = match parse_action(&args_vec) {
            Some(action) => action,
            None => CliAction::ShowHelpDueToError,
        };
        ParsedArgs { action }
    }

    /// Parse the process arguments.
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

fn parse_action(args: &[String]) -> Option<CliAction> {
    let mut global = GlobalOptions::default();
    let mut options = CommandOptions::default();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--debug" | "-d" => global.debug_enabled = true,
            "--help" | "-h" => global.help = true,
            "--version" | "-V" | "-v" => global.version = true,
            "--config" | "-c" => global.config_dir = Some(value(args, &mut i, arg)?.to_string()),
            "--log" => global.log_file = Some(value(args, &mut i, arg)?.to_string()),
            "--json" => options.json = true,
            "--output" | "-o" => {
                options.render.output = value(args, &mut i, arg)?.to_string();
                options.output_given = true;
            }
            "--resolution" | "-r" => {
                options.render.resolution = Some(value(args, &mut i, arg)?.to_string());
            }
            "--width" => options.render.width = Some(number(args, &mut i, arg)?),
            "--height" => options.render.height = Some(number(args, &mut i, arg)?),
            "--zoom" => options.render.zoom = Some(number(args, &mut i, arg)?),
            "--fov" => options.render.fov = Some(number(args, &mut i, arg)?),
            "--stars" => options.render.stars = Some(number(args, &mut i, arg)?),
            "--constellations" => options.render.constellations = Some(number(args, &mut i, arg)?),
            "--tz-offset" => options.render.tz_offset = Some(number(args, &mut i, arg)?),
            "--timezone" => options.render.timezone = Some(value(args, &mut i, arg)?.to_string()),
            "--at" => options.render.at = Some(value(args, &mut i, arg)?.to_string()),
            "--size" => options.size = Some(number(args, &mut i, arg)?),
            _ if arg.starts_with('-') && arg.len() > 1 => {
                log_warning!("Unknown option: {arg}");
                return None;
            }
            _ => options.positional.push(arg.to_string()),
        }
        i += 1;
    }

    if global.version {
        return Some(CliAction::ShowVersion);
    }
    if global.help {
        return Some(CliAction::ShowHelp);
    }

    let (command, rest) = match options.positional.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => ("run", &[][..]),
    };

    let action = match command {
        "run" => {
            expect_no_positionals(command, rest)?;
            CliAction::Run {
                debug_enabled: global.debug_enabled,
                config_dir: global.config_dir,
                log_file: global.log_file,
            }
        }
        "fetch" => {
            expect_no_positionals(command, rest)?;
            CliAction::Fetch {
                debug_enabled: global.debug_enabled,
                config_dir: global.config_dir,
            }
        }
        "render" => {
            expect_no_positionals(command, rest)?;
            if !options.output_given || options.render.output.is_empty() {
                log_warning!("Missing output file. Usage: earthpaper render --output <file>");
                return None;
            }
            if options.render.tz_offset.is_some() && options.render.timezone.is_some() {
                log_warning!("--tz-offset and --timezone cannot be combined");
                return None;
            }
            CliAction::Render {
                debug_enabled: global.debug_enabled,
                config_dir: global.config_dir,
                args: options.render,
            }
        }
        "status" => {
            expect_no_positionals(command, rest)?;
            CliAction::Status {
                config_dir: global.config_dir,
                json: options.json,
            }
        }
        "prepare-night" => match rest {
            [input, output] => CliAction::PrepareNight {
                input: input.clone(),
                output: output.clone(),
                size: options.size,
                config_dir: global.config_dir,
            },
            _ => {
                log_warning!("Usage: earthpaper prepare-night <input> <output> [--size N]");
                return None;
            }
        },
        "help" => match rest {
            [] => CliAction::Help { command: None },
            [command] => CliAction::Help {
                command: Some(command.clone()),
            },
            _ => {
                log_warning!("Usage: earthpaper help [command]");
                return None;
            }
        },
        other => {
            log_warning!("Unknown command: {other}");
            return None;
        }
    };
    Some(action)
}

/// The argument following flag `args[*i]`, advancing past it.
fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Option<&'a str> {
    match args.get(*i + 1) {
        Some(v) => {
            *i += 1;
            Some(v.as_str())
        }
        None => {
            log_warning!("Missing value for {flag}");
            None
        }
    }
}

fn number<T: FromStr>(args: &[String], i: &mut usize, flag: &str) -> Option<T> {
    let raw = value(args, i, flag)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log_warning!("Invalid value for {flag}: {raw}");
            None
        }
    }
}

fn expect_no_positionals(command: &str, rest: &[String]) -> Option<()> {
    if let Some(extra) = rest.first() {
        log_warning!("Unexpected argument for {command}: {extra}");
        return None;
    }
    Some(())
}

/// Display version information.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Display help information.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("earthpaper [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("    --log <file>       Write daemon output to a file");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("run                    Run the acquisition daemon (default)");
    log_indented!("fetch                  Run one acquisition cycle and exit");
    log_indented!("render -o <file>       Render a wallpaper PNG from the cache");
    log_indented!("  --resolution <name>               4K, WQHD, WUXGA, HD or FHD");
    log_indented!("  --width <n> --height <n>          Size in pixels (513-4096)");
    log_indented!("  --zoom <f>                        Earth size vs. the short side (0-1)");
    log_indented!("  --fov <deg>                       Star field of view (30-180)");
    log_indented!("  --stars <f> --constellations <f>  Overlay intensities (0-1)");
    log_indented!("  --tz-offset <min> | --timezone <name>");
    log_indented!("  --at \"YYYY-MM-DD HH:MM\"           Render for a UTC instant");
    log_indented!("status [--json]        Report the current bucket");
    log_indented!("prepare-night <in> <out> [--size <n>]");
    log_indented!("                       Limb-darken a night-lights image");
    log_indented!("help [command]         Show detailed help for a command");
    log_end!();
}
