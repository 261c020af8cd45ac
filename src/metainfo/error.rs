use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors from building, parsing or verifying torrent metadata.
///
/// A failed build never yields partial output: every stage either completes
/// or surfaces exactly one of these.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The builder was configured with values it cannot use (e.g. a piece
    /// length below one). Raised before the source is touched.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Reading the source failed part-way, or it ended before its declared
    /// length.
    #[error("failed to read source: {0}")]
    SourceRead(#[source] std::io::Error),

    /// The digest backend is not available. Not retried.
    #[error("digest unavailable: {0}")]
    DigestUnavailable(&'static str),

    /// The document could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[source] BencodeError),

    /// The build was cancelled before it completed.
    #[error("cancelled")]
    Cancelled,

    /// The torrent file is not valid bencode.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// The info hash has an invalid length (must be 20 bytes).
    #[error("invalid info hash length")]
    InvalidInfoHashLength,

    #[error("invalid magnet link: {0}")]
    InvalidMagnetLink(String),
}
