//! Foreground workload that runs the descriptor's executable as a child.
use std::{
    process::{Child, Command},
    thread,
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tracing::{debug, info, warn};

use crate::{
    constants::{CHILD_POLL_INTERVAL, CHILD_STOP_TIMEOUT},
    error::WorkloadError,
    foreground::Workload,
    service::SysvService,
};

/// Launches the configured command on start and terminates it on stop.
pub struct CommandWorkload {
    child: Option<Child>,
    stop_timeout: Duration,
}

impl Default for CommandWorkload {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandWorkload {
    pub fn new() -> Self {
        Self {
            child: None,
            stop_timeout: CHILD_STOP_TIMEOUT,
        }
    }

    /// Grace period between SIGTERM and SIGKILL.
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// PID of the running child, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    fn wait_for_exit(child: &mut Child, timeout: Duration) -> std::io::Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if child.try_wait()?.is_some() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(CHILD_POLL_INTERVAL);
        }
    }
}

impl Workload for CommandWorkload {
    fn start(&mut self, service: &SysvService) -> Result<(), WorkloadError> {
        let descriptor = service.descriptor();
        let program = descriptor.exec_path()?;

        let mut cmd = Command::new(&program);
        cmd.args(&descriptor.arguments);
        if let Some(dir) = &descriptor.working_directory {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn()?;
        info!(
            "Started '{}' ({}) with PID {}",
            descriptor.name,
            program.display(),
            child.id()
        );
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self, service: &SysvService) -> Result<(), WorkloadError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let name = &service.descriptor().name;

        if let Some(status) = child.try_wait()? {
            debug!("'{name}' already exited with {status}");
            return Ok(());
        }

        let pid = Pid::from_raw(child.id() as i32);
        match signal::kill(pid, Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(err) => return Err(err.into()),
        }

        if !Self::wait_for_exit(&mut child, self.stop_timeout)? {
            warn!(
                "'{name}' did not exit within {:?} after SIGTERM; sending SIGKILL",
                self.stop_timeout
            );
            child.kill()?;
            child.wait()?;
        }

        info!("Stopped '{name}'");
        Ok(())
    }
}
