use thiserror::Error;
use voxtask_core::SyncError;

/// Status the task service uses for policy refusals such as an exceeded quota.
pub const POLICY_REJECTION_STATUS: u16 = 403;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Task service unreachable: {0}")]
    Unreachable(String),

    #[error("Task service rejected request (status {status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Not found on task service: {0}")]
    NotFound(String),

    #[error("Unreadable success response from task service: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// A refusal the caller has to react to (upgrade prompt), never queued.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            ClientError::RemoteRejected { status, .. } if *status == POLICY_REJECTION_STATUS
        )
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Unreachable(_))
    }

    /// The service answered, even if with a failure status.
    pub fn is_remote_answer(&self) -> bool {
        matches!(
            self,
            ClientError::RemoteRejected { .. }
                | ClientError::NotFound(_)
                | ClientError::MalformedResponse(_)
        )
    }

    /// The service accepted the request but its 2xx body could not be decoded.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, ClientError::MalformedResponse(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts, refused connections and broken bodies all look the same to callers.
        ClientError::Unreachable(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let quota = ClientError::RemoteRejected {
            status: 403,
            message: "Task quota exceeded".to_string(),
        };
        assert!(quota.is_policy_rejection());
        assert!(quota.is_remote_answer());
        assert!(!quota.is_unreachable());

        let server_down = ClientError::RemoteRejected {
            status: 503,
            message: String::new(),
        };
        assert!(!server_down.is_policy_rejection());

        let offline = ClientError::Unreachable("connection refused".to_string());
        assert!(offline.is_unreachable());
        assert!(!offline.is_remote_answer());

        assert!(ClientError::NotFound("/tasks/x".to_string()).is_remote_answer());

        let garbled = ClientError::MalformedResponse("expected value".to_string());
        assert!(garbled.is_remote_answer());
        assert!(garbled.is_malformed_response());
        assert!(!garbled.is_policy_rejection());
    }
}
