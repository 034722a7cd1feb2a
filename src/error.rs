use std::path::PathBuf;
use thiserror::Error;

use crate::transfer::TransferError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index store error: {0}")]
    Store(#[from] rocksdb::Error),

    #[error("Missing column family '{0}' in index store")]
    MissingColumnFamily(&'static str),

    #[error("Corrupt index record in '{namespace}': {reason}")]
    CorruptRecord {
        namespace: &'static str,
        reason: String,
    },

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Metrics server error: {0}")]
    Metrics(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Read and write failures on local storage, as opposed to decisions the
    /// pipeline made about a file.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::FileIo { .. } | Error::Transfer(TransferError::Io { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
