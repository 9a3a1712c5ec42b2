//! System V init backend: installs a process as a native background service,
//! renders the shell script that supervises it, and controls the installed
//! service through the host's `service` command or the script itself.

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Shared constants for the init contract.
pub mod constants;

/// BusyBox detection.
pub mod detect;

/// Control command dispatch.
pub mod dispatch;

/// Error handling.
pub mod error;

/// Foreground run loop.
pub mod foreground;

/// Script installation and autostart links.
pub mod install;

/// Logging setup.
pub mod logs;

/// Filesystem layout.
pub mod runtime;

/// Init script rendering.
pub mod script;

/// Service facade.
pub mod service;

/// Status interpretation.
pub mod status;

/// Child-process workload.
pub mod workload;

#[doc(hidden)]
pub mod test_utils;
