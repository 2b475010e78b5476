use mongodb::error::{Error, ErrorKind};

/// Server error codes the administrative workflow reacts to
///
/// See <https://www.mongodb.com/docs/manual/reference/error-codes/>.
pub mod codes {
    pub const USER_NOT_FOUND: i32 = 11;
    pub const UNAUTHORIZED: i32 = 13;
    pub const AUTHENTICATION_FAILED: i32 = 18;
    pub const NAMESPACE_NOT_FOUND: i32 = 26;
    pub const NAMESPACE_EXISTS: i32 = 48;
    pub const DUPLICATE_KEY: i32 = 11000;
    pub const USER_ALREADY_EXISTS: i32 = 51003;
}

/// Error type for MongoDB operations
///
/// Driver errors are classified by kind and command code so callers can
/// apply policy (swallow "already exists", report permission problems)
/// without matching on driver internals.
#[derive(Debug, thiserror::Error)]
pub enum MongoError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Unexpected server response: {0}")]
    InvalidResponse(String),

    #[error("MongoDB error: {0}")]
    Unknown(String),
}

impl MongoError {
    /// Classify a server command failure by its error code
    pub fn from_command_code(code: i32, message: String) -> Self {
        match code {
            codes::UNAUTHORIZED | codes::AUTHENTICATION_FAILED => Self::PermissionDenied(message),
            codes::NAMESPACE_EXISTS | codes::DUPLICATE_KEY | codes::USER_ALREADY_EXISTS => {
                Self::AlreadyExists(message)
            }
            codes::USER_NOT_FOUND | codes::NAMESPACE_NOT_FOUND => Self::NotFound(message),
            _ => Self::OperationFailed(message),
        }
    }
}

impl From<Error> for MongoError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err.kind.as_ref() {
            ErrorKind::Command(command) => Self::from_command_code(command.code, message),
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. } => Self::ConnectionFailed(message),
            ErrorKind::Authentication { .. } => Self::PermissionDenied(message),
            ErrorKind::InvalidArgument { .. } => Self::OperationFailed(message),
            ErrorKind::InvalidResponse { .. }
            | ErrorKind::BsonDeserialization(_)
            | ErrorKind::BsonSerialization(_) => Self::InvalidResponse(message),
            _ => Self::Unknown(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_permission_denied() {
        let err = MongoError::from_command_code(codes::UNAUTHORIZED, "not authorized".into());
        assert!(matches!(err, MongoError::PermissionDenied(_)));
    }

    #[test]
    fn test_namespace_exists_is_already_exists() {
        let err = MongoError::from_command_code(codes::NAMESPACE_EXISTS, "exists".into());
        assert!(matches!(err, MongoError::AlreadyExists(_)));
    }

    #[test]
    fn test_duplicate_user_is_already_exists() {
        let err = MongoError::from_command_code(codes::USER_ALREADY_EXISTS, "User exists".into());
        assert!(matches!(err, MongoError::AlreadyExists(_)));
    }

    #[test]
    fn test_user_not_found() {
        let err = MongoError::from_command_code(codes::USER_NOT_FOUND, "no such user".into());
        assert!(matches!(err, MongoError::NotFound(_)));
    }

    #[test]
    fn test_other_codes_are_operation_failures() {
        // BadValue, e.g. a malformed role document
        let err = MongoError::from_command_code(2, "bad role".into());
        assert!(matches!(err, MongoError::OperationFailed(ref m) if m == "bad role"));
    }

    #[test]
    fn test_display_keeps_server_message() {
        let err = MongoError::ConnectionFailed("server selection timeout".into());
        assert_eq!(err.to_string(), "Connection failed: server selection timeout");
    }
}
