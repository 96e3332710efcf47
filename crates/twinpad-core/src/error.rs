//! Error types.
//!
//! Only genuine failures live here. Not-found and no-op outcomes (a buffer that is not bound to
//! a view, a brace without a partner, a comment pair that cannot be located) are reported as
//! `bool`/`Option` values by the operations themselves.

use crate::buffer::BufferId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by the buffer store (loading, saving, reloading).
pub enum StoreError {
    #[error("I/O error on '{path}': {source}")]
    /// Filesystem I/O failed.
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    #[error("buffer {0:?} not found")]
    /// The buffer id does not resolve to an open buffer.
    BufferNotFound(BufferId),

    #[error("buffer has no file path")]
    /// Saving or reloading an untitled buffer without a target path.
    Untitled,

    #[error("'{0}' is already open")]
    /// Another buffer already owns this path.
    AlreadyOpen(PathBuf),

    #[error("could not decode '{path}' as {encoding}")]
    /// The file content is not representable in the requested encoding.
    Decode {
        /// The file path.
        path: PathBuf,
        /// The encoding label.
        encoding: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
/// Errors produced by search and replace operations.
pub enum FindError {
    #[error("malformed search pattern: {0}")]
    /// The search pattern could not be compiled. Distinct from "zero matches".
    MalformedPattern(String),

    #[error("a replace-in-files operation is already running")]
    /// A non-reentrant operation was entered while already in progress.
    AlreadyRunning,

    #[error("invalid file filter '{pattern}': {message}")]
    /// A file-name filter could not be compiled.
    InvalidFilter {
        /// The offending filter.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}

#[derive(Debug, Error)]
/// Errors produced while loading configuration.
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    /// The TOML document failed to parse.
    Toml(#[from] toml::de::Error),
}
