//! Error types for metadata access.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to read the version-control metadata behind a project root.
///
/// A missing date on a single entry is never reported through this type;
/// only failures affecting the whole traversal are.
#[derive(Debug, Error)]
pub enum MetadataAccessError {
    /// The `git` executable could not be started or its output could not be read.
    #[error("failed to run git {command} in {}: {source}", path.display())]
    Spawn {
        command: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The root is not inside a readable Git working copy.
    #[error("{} is not a git working copy: {stderr}", path.display())]
    NotAWorkingCopy { path: PathBuf, stderr: String },

    /// A git command exited unsuccessfully.
    #[error("git {command} failed in {}: {stderr}", path.display())]
    Command {
        command: &'static str,
        path: PathBuf,
        stderr: String,
    },

    /// Git produced output that could not be decoded.
    #[error("unreadable git {command} output: {detail}")]
    Malformed {
        command: &'static str,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, MetadataAccessError>;
