//! Error types for TVD

use thiserror::Error;

/// Result type alias for TVD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for TVD
///
/// All variants are `Clone` because a pipeline worker's terminal status is
/// sticky: every later client call observes the same error, so it must be
/// possible to hand out copies. The `Io` variant therefore carries the
/// rendered message rather than the `std::io::Error` itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Format error
    #[error("Format error: {0}")]
    Format(String),

    /// Denoiser engine error
    #[error("Engine error: {0}")]
    Engine(String),

    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// End of stream
    #[error("End of stream")]
    EndOfStream,
}

impl Error {
    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create an engine error
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        Error::Engine(msg.into())
    }

    /// Create an initialization error
    pub fn init<S: Into<String>>(msg: S) -> Self {
        Error::Init(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create an unsupported error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
