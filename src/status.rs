//! Classification of `status` output.
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::{dispatch::CommandResult, error::ServiceError};

/// Tri-state service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Running,
    Stopped,
    Unknown,
}

impl Status {
    /// Collapses an interpretation result to the tri-state value.
    pub fn from_result(result: &Result<Status, ServiceError>) -> Status {
        match result {
            Ok(status) => *status,
            Err(_) => Status::Unknown,
        }
    }
}

/// Classifies the result of a `status` dispatch.
///
/// An `Err` always stands for [`Status::Unknown`]: either the dispatch error
/// itself, or [`ServiceError::NotInstalled`] when the output is unrecognised.
pub fn interpret(dispatched: Result<CommandResult, ServiceError>) -> Result<Status, ServiceError> {
    let result = dispatched?;
    if result.stdout.starts_with("Running") {
        Ok(Status::Running)
    } else if result.stdout.starts_with("Stopped") {
        Ok(Status::Stopped)
    } else {
        Err(ServiceError::NotInstalled)
    }
}
