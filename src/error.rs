use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::engine::EngineError;

/// mp3feed's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// mp3feed's crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine could not be initialized or instantiated. No handle exists.
    #[error("failed to initialize decoder: {0}")]
    Init(#[source] EngineError),

    /// The engine rejected an open, close, feed or format request.
    #[error("decoder error: {0}")]
    Engine(#[from] EngineError),

    /// The engine failed while decoding.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The streaming reader was torn down after a fatal error.
    #[error("decoder has been torn down")]
    Closed,

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            Error::Other(inner) => match inner.downcast::<io::Error>() {
                Ok(io_err) => *io_err,
                Err(inner) => io::Error::other(inner),
            },
            err => io::Error::other(err),
        }
    }
}
