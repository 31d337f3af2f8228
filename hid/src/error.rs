//! Error model shared by every operation.

use std::io;

use crate::capability::Capability;

/// Message used when the transport reports a failure without saying why.
pub const UNSPECIFIED_ERROR: &str = "unspecified error";

/// An error from the HID layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The transport reported a failure. The message is never empty.
    #[error("{0}")]
    Transport(String),
    /// A read returned without data inside its allotted wait.
    #[error("timeout")]
    Timeout,
    /// A report buffer had no room for the report ID byte.
    #[error("report buffer must hold at least one byte")]
    EmptyBuffer,
    /// Shutdown was requested while handles were still open.
    #[error("{0} device handle(s) still open")]
    HandlesOpen(usize),
    /// The loaded transport does not provide the capability.
    #[error("{0} is not supported by the loaded transport")]
    NotSupported(Capability),
    /// The transport library could not be loaded.
    #[error("failed to load HID transport library: {0}")]
    Load(String),
}

impl Error {
    /// Builds a transport error from an optional message, substituting
    /// [`UNSPECIFIED_ERROR`] when the transport gave none.
    pub fn transport(message: Option<String>) -> Self {
        match message {
            Some(message) if !message.is_empty() => Error::Transport(message),
            _ => Error::Transport(UNSPECIFIED_ERROR.to_string()),
        }
    }

    /// Returns `true` for [`Error::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::Timeout => io::ErrorKind::TimedOut,
            Error::EmptyBuffer => io::ErrorKind::InvalidInput,
            Error::NotSupported(_) => io::ErrorKind::Unsupported,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
