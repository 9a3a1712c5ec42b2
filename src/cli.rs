//! Command-line interface for `svcctl`.
use std::{path::PathBuf, str::FromStr};

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let level = match trimmed.to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" | "err" => LevelFilter::ERROR,
            "warn" | "warning" => LevelFilter::WARN,
            "info" | "information" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => return Err(format!("invalid log level '{trimmed}'")),
        };

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for `svcctl`.
#[derive(Parser)]
#[command(name = "svcctl", version, author)]
#[command(about = "Install and control a System V init service", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Path to the service definition file.
    #[arg(short, long, default_value = "service.yaml", global = true)]
    pub config: PathBuf,

    /// Root directory of the init layout (`/etc/init.d`, `/etc/rc<N>.d`, ...).
    #[arg(long, default_value = "/", global = true)]
    pub root: PathBuf,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for `svcctl`.
#[derive(Subcommand)]
pub enum Commands {
    /// Write the init script and reconcile its autostart links.
    Install,

    /// Remove the init script. Autostart links are left in place.
    Uninstall,

    /// Create the autostart links.
    Enable,

    /// Remove the autostart links.
    Disable,

    /// Start the installed service.
    Start,

    /// Stop the installed service.
    Stop,

    /// Stop, then start the installed service.
    Restart,

    /// Show whether the service is running.
    Status {
        /// Emit machine-readable JSON output.
        #[arg(long)]
        json: bool,
    },

    /// Run the service executable in the foreground until SIGINT/SIGTERM.
    Run,

    /// Print the init script that `install` would write.
    Render {
        /// Render the BusyBox variant instead of probing the host.
        #[arg(long)]
        busybox: bool,
    },

    /// Report whether the host's process listing tool is BusyBox.
    Detect,
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
