use thiserror::Error;

use crate::types::PermissionType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown permission type: {0}")]
    InvalidPermissionType(i64),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Method not implemented: {0}")]
    NotImplemented(String),

    #[error("A {0} permission request is already in progress")]
    AlreadyInProgress(PermissionType),

    #[error("Timed out waiting for {0} authorization")]
    Timeout(PermissionType),
}

impl BridgeError {
    /// Stable code sent over the method channel.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvalidPermissionType(_) => "INVALID_PERMISSION_TYPE",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::AlreadyInProgress(_) => "ALREADY_IN_PROGRESS",
            Self::Timeout(_) => "TIMEOUT",
        }
    }
}
