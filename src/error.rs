//! Engine errors

use crate::app::ConfigError;
use crate::native::NativeError;
use crate::render::CellMetrics;

/// Result of an engine entry point
pub type Result<T> = std::result::Result<T, DisplayError>;

/// Errors returned by display connection entry points
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    /// The connection hit a fatal native error; it stays inert until closed
    #[error("display connection is dead")]
    ConnectionDead,

    #[error("font not found: {0}")]
    FontNotFound(String),

    #[error("font extents mismatch: {name} has {found:?} cells, expected {expected:?}")]
    MetricsMismatch {
        name: String,
        expected: CellMetrics,
        found: CellMetrics,
    },

    /// A variant was loaded before any base font
    #[error("no base font loaded")]
    NoBaseFont,

    /// Neither the configured base font nor the fallback could be loaded
    #[error("no usable font")]
    NoFont,

    #[error("unknown selection or cut buffer: {0}")]
    UnknownSelection(String),

    /// A synchronous paste source held no text
    #[error("nothing to paste")]
    NothingToPaste,

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DisplayError {
    /// Whether the error means the native link is gone
    pub fn is_fatal(&self) -> bool {
        match self {
            DisplayError::ConnectionDead => true,
            DisplayError::Native(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DisplayError::ConnectionDead.is_fatal());
        assert!(DisplayError::from(NativeError::Io("gone".into())).is_fatal());
        assert!(!DisplayError::from(NativeError::Request {
            request: "CopyArea",
            code: 8
        })
        .is_fatal());
        assert!(!DisplayError::FontNotFound("fixed".into()).is_fatal());
    }

    #[test]
    fn test_messages() {
        assert_eq!(DisplayError::FontNotFound("x".into()).to_string(), "font not found: x");
        assert_eq!(DisplayError::ConnectionDead.to_string(), "display connection is dead");
    }
}
