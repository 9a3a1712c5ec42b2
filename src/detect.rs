//! Host probing used to pick the liveness check of the generated script.
use std::process::{Command, Stdio};

use tracing::debug;

use crate::constants::{
    BUSYBOX_MARKER, BUSYBOX_PROBE_ARGS, BUSYBOX_PROBE_PROGRAM, UNRECOGNIZED_OPTION_MARKER,
};

/// Returns `true` when the probe's stderr carries both BusyBox markers.
pub fn classify_probe_output(stderr: &str) -> bool {
    stderr.contains(UNRECOGNIZED_OPTION_MARKER) && stderr.contains(BUSYBOX_MARKER)
}

/// Runs `program` with flags BusyBox `ps` rejects and classifies its stderr.
///
/// Any launch failure counts as "not BusyBox".
pub fn probe_with(program: &str) -> bool {
    let output = Command::new(program)
        .args(BUSYBOX_PROBE_ARGS)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output();

    match output {
        Ok(output) => classify_probe_output(&String::from_utf8_lossy(&output.stderr)),
        Err(err) => {
            debug!("BusyBox probe '{program}' could not run: {err}");
            false
        }
    }
}

/// Detects whether the host's process listing tool is BusyBox.
pub fn is_running_busybox() -> bool {
    let busybox = probe_with(BUSYBOX_PROBE_PROGRAM);
    debug!("BusyBox process listing detected: {busybox}");
    busybox
}
