//! Failures of the loading, derivation and caching layers
//!
//! The command line front-end erases these into [`anyhow::Error`], but the
//! dashboard needs to tell them apart in order to show a single section as
//! unavailable instead of giving up on the whole page.

use std::path::PathBuf;
use thiserror::Error;

/// Things that can go wrong while producing a chart-ready table
#[derive(Debug, Error)]
pub enum Error {
    /// A backing data file could not be opened
    #[error("data file {} is unavailable: {source}", path.display())]
    DataUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backing data file is not valid CSV
    #[error("failed to parse {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv_async::Error,
    },

    /// Lookup of a conference code or display name that we don't know about
    #[error("unknown conference {0:?}")]
    UnknownConference(Box<str>),

    /// The user could not be asked to pick a conference
    #[error("no conference was selected: {0}")]
    NoSelection(#[source] dialoguer::Error),

    /// Two entries of a conference name map collide
    #[error("conference name map is not a bijection, {0:?} appears twice")]
    NotBijective(Box<str>),

    /// A table lacks a column that a derivation needs
    #[error("table {table:?} has no column {column:?}")]
    SchemaMismatch { table: Box<str>, column: Box<str> },

    /// A column that should be numeric contains something else
    #[error("column {column:?} of table {table:?} holds non-numeric value {value:?}")]
    NotNumeric {
        table: Box<str>,
        column: Box<str>,
        value: Box<str>,
    },

    /// A collaboration graph edge points to a node without metadata
    #[error("collaboration graph node {0:?} has no metadata")]
    MissingNode(Box<str>),

    /// A cache artifact exists but cannot be decoded
    #[error("cache artifact {} is corrupt: {source}", path.display())]
    CorruptArtifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The cache directory could not be read or written
    #[error("cache I/O on {} failed: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type of the dashboard layers
pub type Result<T> = std::result::Result<T, Error>;
