use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    // Config
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Traversal
    #[error("walk failed at {path}")]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Git subprocess
    #[error("failed to spawn git")]
    GitSpawn(#[source] io::Error),

    #[error("git {op} failed in {repo}: {detail}")]
    Git {
        op: &'static str,
        repo: PathBuf,
        detail: String,
    },
}

impl ScanError {
    /// The path this error occurred at, if applicable.
    /// Callers use this to present "failed at: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Traversal { path, .. } | Self::Read { path, .. } | Self::Git { repo: path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}
