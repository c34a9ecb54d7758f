//! Error types for the ntuple converter library.

use std::fmt;
use std::path::PathBuf;

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Label used for the root tree in diagnostics.
fn tree_label(tree: &str) -> &str {
    if tree.is_empty() {
        "(root)"
    } else {
        tree
    }
}

/// Errors that can occur when reading ntuple files or writing Zarr stores.
#[derive(Debug)]
pub enum Error {
    /// Pre-flight validation failure (bad output directory, bad input path).
    /// Fatal for the whole run, raised before any file is processed.
    Config(String),

    /// Invalid ntuple file format (wrong magic bytes, truncated data, ...)
    InvalidFormat(String),

    /// I/O error occurred while reading or writing
    Io(std::io::Error),

    /// Schema resolution or probing error for one tree (absent tree,
    /// unknown branch, tree with no baskets to probe)
    Schema { tree: String, message: String },

    /// A batch disagreed with the previously probed schema for a column
    WriteMismatch {
        tree: String,
        column: String,
        message: String,
    },

    /// The destination store already exists; the existing store is left
    /// untouched
    DestinationConflict(PathBuf),

    /// Destination write error (wrapped Zarr store/array error)
    Output(String),

    /// Generic error with message
    Other(String),
}

impl Error {
    pub(crate) fn schema(tree: &str, message: impl Into<String>) -> Self {
        Error::Schema {
            tree: tree.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn write_mismatch(tree: &str, column: &str, message: impl Into<String>) -> Self {
        Error::WriteMismatch {
            tree: tree.to_string(),
            column: column.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidFormat(msg) => write!(f, "Invalid ntuple format: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Schema { tree, message } => {
                write!(f, "Schema error in tree {}: {}", tree_label(tree), message)
            }
            Error::WriteMismatch {
                tree,
                column,
                message,
            } => write!(
                f,
                "Write mismatch in tree {}, branch {}: {}",
                tree_label(tree),
                column,
                message
            ),
            Error::DestinationConflict(path) => write!(
                f,
                "Destination {} already exists. Please delete.",
                path.display()
            ),
            Error::Output(msg) => write!(f, "Output error: {}", msg),
            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
