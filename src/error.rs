//! Errors for core file and /proc parsing.
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PargsError {
    /// The core file (or a /proc file) doesn't look the way it should: truncated,
    /// bad magic, something overflows, a sentinel or pattern is missing, etc.
    #[error("{0}")]
    Format(String),

    /// Opening, mapping, reading, or writing failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PargsError>;

impl PargsError {
    pub fn format(mesg: impl Into<String>) -> Self {
        PargsError::Format(mesg.into())
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        PargsError::Io {
            context: context.into(),
            source,
        }
    }

    /// Used by the output macros.
    pub fn output(source: io::Error) -> Self {
        PargsError::io("couldn't write output", source)
    }

    #[cfg(test)]
    pub fn is_format(&self) -> bool {
        matches!(self, PargsError::Format(_))
    }

    /// Reading another user's process is expected to fail like this and the caller
    /// should just skip that process.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            PargsError::Io { source, .. } => source.kind() == io::ErrorKind::PermissionDenied,
            PargsError::Format(_) => false,
        }
    }
}
