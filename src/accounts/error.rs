use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Email already registered")]
    DuplicateEmail,

    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Corrupt record under {key}: {source}")]
    StorageCorrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    StorageUnavailable(#[from] StorageError),

    #[error("Encoding record failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Password hashing failed")]
    Hashing,
}

impl AccountError {
    /// Message safe to hand to a client: storage and hashing details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AccountError::StorageCorrupt { .. }
            | AccountError::StorageUnavailable(_)
            | AccountError::Encode(_)
            | AccountError::Hashing => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type AccountResult<T> = Result<T, AccountError>;
