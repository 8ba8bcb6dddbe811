//! Error types for Assetgate

use std::io::ErrorKind;
use thiserror::Error;

/// Result type for Assetgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Assetgate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An aliased resource was denied by the root's alias check
    #[error("Rejected alias reference: {0}")]
    AliasRejected(String),

    /// The client went away while the response was being written
    #[error("Client disconnected")]
    Disconnected,

    /// Delivery error
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error means the peer stopped reading.
    ///
    /// Disconnects are expected during delivery and are never logged.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Disconnected => true,
            Error::Io(e) => matches!(
                e.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// True when the error is an alias rejection
    pub fn is_alias_rejection(&self) -> bool {
        matches!(self, Error::AliasRejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_kinds() {
        assert!(Error::Disconnected.is_disconnect());
        assert!(Error::from(std::io::Error::from(ErrorKind::BrokenPipe)).is_disconnect());
        assert!(Error::from(std::io::Error::from(ErrorKind::ConnectionReset)).is_disconnect());
        assert!(!Error::from(std::io::Error::from(ErrorKind::PermissionDenied)).is_disconnect());
        assert!(!Error::AliasRejected("/x".into()).is_disconnect());
    }

    #[test]
    fn test_alias_rejection() {
        let err = Error::AliasRejected("/static/link".to_string());
        assert!(err.is_alias_rejection());
        assert_eq!(err.to_string(), "Rejected alias reference: /static/link");
        assert!(!Error::Config("x".into()).is_alias_rejection());
    }
}
