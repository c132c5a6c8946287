use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RecoverabilityError {
    StorageError(String),
    MessagingError(String),
    DispatchError(String),
    RegroupingError(String),
    ConfigurationError(String),
    InvalidState(String),
    Timeout(String),
}

impl fmt::Display for RecoverabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoverabilityError::StorageError(msg) => write!(f, "Storage error: {msg}"),
            RecoverabilityError::MessagingError(msg) => write!(f, "Messaging error: {msg}"),
            RecoverabilityError::DispatchError(msg) => write!(f, "Dispatch error: {msg}"),
            RecoverabilityError::RegroupingError(msg) => write!(f, "Regrouping error: {msg}"),
            RecoverabilityError::ConfigurationError(msg) => {
                write!(f, "Configuration error: {msg}")
            }
            RecoverabilityError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            RecoverabilityError::Timeout(msg) => write!(f, "Timeout: {msg}"),
        }
    }
}

impl std::error::Error for RecoverabilityError {}

pub type Result<T> = std::result::Result<T, RecoverabilityError>;
