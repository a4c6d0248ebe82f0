//! Error types shared by the synchronization engine.

use std::sync::Arc;

pub type Result<T> = std::result::Result<T, Error>;

/// A clonable handle to an error. A failed pipeline parks its error in the
/// view state where any number of readers may observe it.
pub type SharedError = Arc<Error>;

/// The failure taxonomy of the engine.
///
/// `Transport` and `Decode` are surfaced to consumers through a view's
/// `error()`. `Cancelled` is internal: it marks an operation that was
/// superseded and is swallowed at the pipeline boundary, never shown.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A network or HTTP failure while talking to the record store. The
    /// engine does not retry; retry policy belongs to the caller.
    #[error("transport failure: {message}")]
    Transport {
        message: String,
        /// The HTTP status, when the failure happened above the socket level.
        status: Option<u16>,
    },

    /// An in-flight operation was cancelled because its pipeline generation
    /// was superseded or its view was disposed.
    #[error("operation cancelled")]
    Cancelled,

    /// The record store answered with a payload we could not decode.
    #[error("failed to decode {context}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
            status: None,
        }
    }

    pub(crate) fn transport_status(status: u16, message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
            status: Some(status),
        }
    }

    pub(crate) fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Decode {
            context: context.into(),
            source,
        }
    }

    /// True for the internal cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}
