//! Constants for the System V init contract.
//!
//! File layout, autostart priorities, option keys and probe markers live here so
//! the installer, renderer and dispatcher agree on them.

use std::time::Duration;

// ============================================================================
// File System Layout
// ============================================================================

/// Directory holding init scripts, relative to the layout root.
pub const INIT_DIR: &str = "etc/init.d";

/// Parent of the `rc<N>.d` runlevel directories, relative to the layout root.
pub const RC_PARENT_DIR: &str = "etc";

/// Directory the generated script writes its PID file into.
pub const PID_DIR: &str = "var/run";

/// Directory searched for per-service environment override files.
pub const ENV_OVERRIDE_DIR: &str = "etc/sysconfig";

/// Log directory used when the `LogDirectory` option is not set.
pub const DEFAULT_LOG_DIRECTORY: &str = "/var/log";

/// Permission bits applied to the installed script.
pub const SCRIPT_MODE: u32 = 0o755;

// ============================================================================
// Autostart Links
// ============================================================================

/// Runlevels that start the service.
pub const START_RUNLEVELS: [u8; 4] = [2, 3, 4, 5];

/// Runlevels that stop the service.
pub const STOP_RUNLEVELS: [u8; 3] = [0, 1, 6];

/// Link prefix for start runlevels.
pub const START_PREFIX: &str = "S50";

/// Link prefix for stop runlevels.
pub const KILL_PREFIX: &str = "K02";

// ============================================================================
// Option Keys
// ============================================================================

/// Requests a per-user service (unsupported here).
pub const OPTION_USER_SERVICE: &str = "UserService";

/// Replaces the built-in script with operator supplied text.
pub const OPTION_SYSV_SCRIPT: &str = "SysvScript";

/// Directory receiving the service stdout/stderr logs.
pub const OPTION_LOG_DIRECTORY: &str = "LogDirectory";

/// Whether the autostart links should exist.
pub const OPTION_ENABLED: &str = "Enabled";

/// Custom blocking wait used by the foreground runner.
pub const OPTION_RUN_WAIT: &str = "RunWait";

// ============================================================================
// Control Commands
// ============================================================================

/// Generic service-control entry point looked up on `PATH`.
pub const SERVICE_COMMAND: &str = "service";

/// Pause between stop and start during a restart.
pub const RESTART_PAUSE: Duration = Duration::from_millis(50);

/// Number of liveness polls the script performs after sending SIGTERM.
pub const STOP_POLL_ATTEMPTS: u32 = 10;

/// Platform identifier reported by the backend.
pub const PLATFORM: &str = "linux-sysv";

// ============================================================================
// BusyBox Detection
// ============================================================================

/// Listing tool invoked by the probe.
pub const BUSYBOX_PROBE_PROGRAM: &str = "ps";

/// Flags accepted by procps but rejected by BusyBox.
pub const BUSYBOX_PROBE_ARGS: [&str; 1] = ["xaw"];

/// Generic marker printed for an unsupported flag.
pub const UNRECOGNIZED_OPTION_MARKER: &str = "unrecognized option";

/// Vendor marker printed by BusyBox usage output.
pub const BUSYBOX_MARKER: &str = "BusyBox";

// ============================================================================
// Foreground Runner
// ============================================================================

/// Capacity of the signal queue used by the foreground wait.
pub const SIGNAL_QUEUE_CAPACITY: usize = 3;

/// Grace period for a foreground child after SIGTERM.
pub const CHILD_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval while waiting for a foreground child to exit.
pub const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(100);
