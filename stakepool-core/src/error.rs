use thiserror::Error;

pub type Result<T> = std::result::Result<T, EscrowError>;

#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Game not found: {0}")]
    NotFound(u64),

    #[error("Invalid game state: {0}")]
    InvalidState(String),

    #[error("Game deadline has passed")]
    Expired,

    #[error("Max participants reached")]
    Full,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid winner distribution: {0}")]
    InvalidDistribution(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EscrowError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn invalid_distribution(msg: impl Into<String>) -> Self {
        Self::InvalidDistribution(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for the rejections a caller can fix by re-invoking with
    /// different arguments, as opposed to storage or environment failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_)
                | Self::NotFound(_)
                | Self::InvalidState(_)
                | Self::Expired
                | Self::Full
                | Self::InvalidOperation(_)
                | Self::InvalidDistribution(_)
        )
    }
}
