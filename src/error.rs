//! Error handling for the System V service backend.
use std::{io, path::PathBuf};

use thiserror::Error;

use crate::dispatch::Operation;

/// Boxed error returned by workload callbacks.
pub type WorkloadError = Box<dyn std::error::Error + Send + Sync>;

/// Defines all possible errors raised while installing or controlling a service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller asked for a per-user service, which System V init has no namespace for.
    #[error("User services are not supported on SystemV")]
    UserServiceUnsupported,

    /// An init script already exists at the install target.
    #[error("Init already exists: {}", .0.display())]
    AlreadyInstalled(PathBuf),

    /// The service is not installed, or its status output was not recognised.
    #[error("the service is not installed")]
    NotInstalled,

    /// Filesystem error on a specific path.
    #[error("{}: {source}", path.display())]
    Path {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Any other I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Neither the service entry point nor the init script could be invoked.
    #[error("Failed to dispatch '{operation}' for service '{service}': {source}")]
    Dispatch {
        /// The service name.
        service: String,
        /// The operation being dispatched.
        operation: Operation,
        /// The error raised by the primary entry point.
        #[source]
        source: io::Error,
    },

    /// The control command ran but reported failure.
    #[error("'{operation}' for service '{service}' exited with status {code}")]
    CommandFailed {
        /// The service name.
        service: String,
        /// The operation that failed.
        operation: Operation,
        /// Exit code reported by the control command.
        code: i32,
    },

    /// The service name cannot be used as an init script file name.
    #[error("Invalid service name '{0}': must be a single path component")]
    InvalidName(String),

    /// A custom init script template could not be rendered.
    #[error("Invalid init script template: {0}")]
    Template(String),

    /// Error reading the service definition file.
    #[error("Failed to read config file: {0}")]
    ConfigRead(#[source] io::Error),

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// The service definition references an unset environment variable.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// The termination signal handler could not be installed.
    #[error("Failed to install signal handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),

    /// A workload start or stop callback failed.
    #[error("Workload failed: {0}")]
    Workload(#[source] WorkloadError),
}

impl ServiceError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ServiceError::Path {
            path: path.into(),
            source,
        }
    }

    /// Returns the `io::ErrorKind` carried by this error, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            ServiceError::Path { source, .. }
            | ServiceError::Io(source)
            | ServiceError::Dispatch { source, .. }
            | ServiceError::ConfigRead(source) => Some(source.kind()),
            _ => None,
        }
    }
}
