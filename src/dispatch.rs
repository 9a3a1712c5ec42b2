//! Invocation of the installed service through the host's control commands.
use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use strum_macros::{AsRefStr, Display, EnumString};
use tracing::debug;

use crate::{constants::SERVICE_COMMAND, error::ServiceError};

/// Operations understood by the init script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Start,
    Stop,
    Restart,
    Status,
}

impl Operation {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

/// Exit code and (optionally) captured stdout of a control command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub code: i32,
    pub stdout: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs external programs. A non-zero exit is a result, not an error; only a
/// failure to launch or wait is.
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[&str], capture_stdout: bool)
    -> io::Result<CommandResult>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &Path,
        args: &[&str],
        capture_stdout: bool,
    ) -> io::Result<CommandResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());

        if capture_stdout {
            let output = cmd.stdout(Stdio::piped()).output()?;
            Ok(CommandResult {
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        } else {
            let status = cmd.status()?;
            Ok(CommandResult {
                code: status.code().unwrap_or(-1),
                stdout: String::new(),
            })
        }
    }
}

/// Sends operations to one installed service.
///
/// Runs `service <name> <op>`. Hosts without a `service` executable (OpenWrt
/// and friends ship it as a shell function only) get the init script invoked
/// directly instead. With no entry point the script is always invoked directly.
pub struct Dispatcher<R = SystemRunner> {
    service: String,
    script_path: PathBuf,
    entry_point: Option<PathBuf>,
    runner: R,
}

impl Dispatcher<SystemRunner> {
    pub fn new(service: impl Into<String>, script_path: PathBuf) -> Self {
        Self::with_runner(service, script_path, SystemRunner)
    }
}

impl<R: CommandRunner> Dispatcher<R> {
    pub fn with_runner(service: impl Into<String>, script_path: PathBuf, runner: R) -> Self {
        Self {
            service: service.into(),
            script_path,
            entry_point: Some(PathBuf::from(SERVICE_COMMAND)),
            runner,
        }
    }

    /// Replaces the generic control entry point (`service` by default).
    pub fn entry_point(mut self, program: impl Into<PathBuf>) -> Self {
        self.entry_point = Some(program.into());
        self
    }

    /// Skips the generic entry point and always invokes the init script.
    pub fn script_only(mut self) -> Self {
        self.entry_point = None;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn dispatch(
        &self,
        operation: Operation,
        capture_stdout: bool,
    ) -> Result<CommandResult, ServiceError> {
        let Some(entry_point) = &self.entry_point else {
            return self
                .run_script(operation, capture_stdout)
                .map_err(|err| self.dispatch_error(operation, err));
        };

        let err = match self.runner.run(
            entry_point,
            &[self.service.as_str(), operation.as_str()],
            capture_stdout,
        ) {
            Ok(result) => {
                debug!(
                    "'{} {} {}' exited with {}",
                    entry_point.display(),
                    self.service,
                    operation,
                    result.code
                );
                return Ok(result);
            }
            Err(err) => err,
        };

        if err.kind() == io::ErrorKind::NotFound {
            debug!(
                "'{}' not available ({err}); invoking {} directly",
                entry_point.display(),
                self.script_path.display()
            );
            if let Ok(result) = self.run_script(operation, capture_stdout) {
                return Ok(result);
            }
        }

        Err(self.dispatch_error(operation, err))
    }

    fn run_script(&self, operation: Operation, capture_stdout: bool) -> io::Result<CommandResult> {
        self.runner
            .run(&self.script_path, &[operation.as_str()], capture_stdout)
    }

    fn dispatch_error(&self, operation: Operation, source: io::Error) -> ServiceError {
        ServiceError::Dispatch {
            service: self.service.clone(),
            operation,
            source,
        }
    }
}
