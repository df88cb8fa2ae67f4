//! Console error types.

use std::fmt;

/// Console-specific errors.
///
/// Command-level failures (bad arity, unknown peer, invalid payload) are
/// user-facing messages, not errors; only faults of the console itself land
/// here.
#[derive(Debug)]
pub enum ConsoleError {
    /// Starting the mesh node failed.
    Startup(String),
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup(msg) => write!(f, "startup error: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
