//! Error types for MailGate

use thiserror::Error;

/// Main error type for MailGate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for MailGate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the HTTP status code for this error.
    ///
    /// Every error class here is a server-side failure; the auth protocol
    /// never reports errors to the proxy through the status line except as
    /// a 5xx with no protocol headers.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config(_) => 500,
            Error::Directory(_) => 500,
            Error::Io(_) => 500,
            Error::Other(_) => 500,
        }
    }
}
