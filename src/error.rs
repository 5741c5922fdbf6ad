use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while building a metainfo file.
///
/// Every variant carries exactly the context relevant to it: read and write
/// failures name the offending path and keep the underlying [`io::Error`] so
/// the OS error code survives to the caller.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The input path does not exist.
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Reading an input file or directory failed.
    #[error("error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the output document failed.
    #[error("error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A build option is unusable: bad piece length, malformed tracker URL,
    /// or a private torrent without trackers.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The build was cancelled before completion.
    #[error("cancelled")]
    Cancelled,
}

impl BuildError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Write {
            path: path.into(),
            source,
        }
    }

    /// The path the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            BuildError::PathNotFound(path) => Some(path),
            BuildError::Read { path, .. } | BuildError::Write { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The underlying OS error code, if any.
    pub fn os_error_code(&self) -> Option<i32> {
        match self {
            BuildError::Read { source, .. } | BuildError::Write { source, .. } => {
                source.raw_os_error()
            }
            _ => None,
        }
    }
}
