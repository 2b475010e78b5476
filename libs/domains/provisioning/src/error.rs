use database::mongodb::MongoError;
use serde::Serialize;
use strum::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Could not connect to MongoDB: {0}")]
    Connection(String),

    #[error("Insufficient privileges: {0}")]
    Permission(String),

    #[error("Operation rejected by server: {0}")]
    Operation(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Coarse error classification carried in run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Connection,
    Permission,
    Operation,
    AlreadyExists,
    Validation,
    Unknown,
}

impl ProvisionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection(_) => ErrorCategory::Connection,
            Self::Permission(_) => ErrorCategory::Permission,
            Self::Operation(_) => ErrorCategory::Operation,
            Self::AlreadyExists(_) => ErrorCategory::AlreadyExists,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    /// Probable cause, phrased for the operator running the tool
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Connection(_) => {
                "Ensure the MongoDB server is running and reachable at the configured URL."
            }
            Self::Permission(_) => {
                "Connect as a user with the userAdmin (or root) role on the auth database, \
                 e.g. by embedding admin credentials in MONGODB_URL."
            }
            Self::Operation(_) => "Check the role name and database name in the configuration.",
            Self::AlreadyExists(_) => "The object already exists; nothing to do.",
            Self::Validation(_) => "Fix the configuration and run again.",
            Self::Unknown(_) => "Inspect the server logs for details.",
        }
    }
}

impl From<MongoError> for ProvisionError {
    fn from(err: MongoError) -> Self {
        match err {
            MongoError::ConnectionFailed(msg) => Self::Connection(msg),
            MongoError::PermissionDenied(msg) => Self::Permission(msg),
            MongoError::AlreadyExists(msg) => Self::AlreadyExists(msg),
            MongoError::NotFound(msg) | MongoError::OperationFailed(msg) => Self::Operation(msg),
            MongoError::InvalidResponse(msg) | MongoError::Unknown(msg) => Self::Unknown(msg),
        }
    }
}

impl From<core_config::ConfigError> for ProvisionError {
    fn from(err: core_config::ConfigError) -> Self {
        Self::Validation(err.to_string())
    }
}
