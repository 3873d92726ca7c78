//! Error types for audio server access.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("failed to enumerate {0}")]
    Enumeration(String),

    #[error("property access failed on {path}: {message}")]
    Property { path: String, message: String },

    #[error("audio object {0} not found")]
    ObjectNotFound(String),

    #[error("audio server connection lost: {0}")]
    Disconnected(String),
}

impl Error {
    pub fn property(path: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Error::Property {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
