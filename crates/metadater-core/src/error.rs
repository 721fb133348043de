use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::source::MetadataSource;

/// Problems with the run configuration. Raised before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no metadata sources selected")]
    NoSources,
    #[error("metadata source `{0}` listed more than once")]
    DuplicateSource(MetadataSource),
    #[error("unknown metadata source `{0}` (expected exif, json or filename)")]
    UnknownSource(String),
    #[error("the `filename` source needs at least one file name pattern")]
    MissingFilenamePatterns,
    #[error("invalid file name pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("input directory does not exist: {0}")]
    InputMissing(PathBuf),
    #[error("input is not a directory: {0}")]
    InputNotDirectory(PathBuf),
    #[error("output is not a directory: {0}")]
    OutputNotDirectory(PathBuf),
    #[error("cannot create output directory {path}: {source}")]
    CreateOutput { path: PathBuf, source: io::Error },
}

/// A sidecar exists but cannot be used. Treated as "no metadata found".
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("cannot read sidecar {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed sidecar {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// EXIF could not be embedded into the output file. The writer falls back
/// to setting the filesystem timestamp only.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("output format `{0}` does not support EXIF writing")]
    UnsupportedOutputFormat(String),
    #[error("EXIF write failed: {0}")]
    Exif(String),
}

/// Per-file failure. The file is skipped and the batch continues.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("cannot set timestamps on {path}: {source}")]
    Timestamp { path: PathBuf, source: io::Error },
}

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cancelled(#[from] crate::cancel::CancelledError),
}
