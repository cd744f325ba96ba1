//! Error taxonomy shared by the reader, the report writers and the sorter.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a model file could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a binary glTF container (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("unsupported glTF container version {0}")]
    UnsupportedVersion(u32),
    #[error("file truncated: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },
    #[error("first chunk is not JSON (type 0x{0:08X})")]
    MissingJsonChunk(u32),
    #[error("JSON chunk is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("invalid JSON chunk: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("VRM metadata not found")]
    MissingVrmExtension,
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("destination already exists: {}", path.display())]
    Collision { path: PathBuf },

    #[error("unusable mapping file {}: {reason}", path.display())]
    Mapping { path: PathBuf, reason: String },

    #[error("invalid input pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Write {
            path: path.into(),
            source,
        }
    }

    pub fn mapping(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::Mapping {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
