//! Error types for the classifier pipeline.
//!
//! Conditions reachable from user-controlled input (CLI flags, on-disk
//! files) are reported through [`AppError`] and propagated with `anyhow`.
//! Conditions that indicate an internal invariant violation (a classifier
//! decision referencing a locus absent from the index) are bugs, not
//! recoverable errors, and are caught with `debug_assert!`/`unreachable!`
//! at the call site instead of being threaded through `Result`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed k-mer/graph file {path}: {reason}")]
    MalformedIndexFile { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("read pair {0} is missing its mate (odd number of records in interleaved input)")]
    UnpairedRead(u64),

    #[error("simulation locus map has no entry for genome locus {locus} (map has {len} entries)")]
    UnknownLocusInMap { locus: u32, len: usize },
}

pub type Result<T> = std::result::Result<T, AppError>;
