use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Injector '{0}' is not registered")]
    MissingInjector(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl ResourceError {
    /// Fatal errors are programmer mistakes: they are rolled back and
    /// returned to the caller instead of being recorded as a failed read.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ResourceError::Configuration(_) | ResourceError::Runtime(_) | ResourceError::LockError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ResourceError>;

impl<T> From<std::sync::PoisonError<T>> for ResourceError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
