//! Single-file v1 torrent builder.
//!
//! ```
//! use bdesk::metainfo::{TorrentBuilder, TrackerList};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = TorrentBuilder::new("a.txt")
//!     .piece_length(256)
//!     .trackers(TrackerList::parse("udp://t1, udp://t2"))
//!     .build(&vec![7u8; 1000])?;
//!
//! assert_eq!(torrent.piece_count, 4);
//! assert!(torrent.magnet_uri.ends_with("&dn=a.txt&tr=udp%3A%2F%2Ft1&tr=udp%3A%2F%2Ft2"));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::error::MetainfoError;
use super::info_hash::InfoHash;
use super::magnet::MagnetLink;
use super::pieces::{hash_reader, hash_source, FileSource, PieceLayout, PieceLength, PieceSource};
use super::trackers::TrackerList;
use crate::bencode::{encode, Value};
use crate::constants::DEFAULT_PIECE_LENGTH;

/// Everything produced by one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentArtifact {
    /// The bencoded `.torrent` document.
    pub document: Bytes,
    /// SHA-1 of the bencoded info dictionary.
    pub info_hash: InfoHash,
    pub magnet_uri: String,
    pub name: String,
    pub length: u64,
    pub piece_length: u64,
    pub piece_count: usize,
}

impl TorrentArtifact {
    /// Suggested file name for the document, `<name>.torrent`.
    pub fn file_name(&self) -> String {
        format!("{}.torrent", self.name)
    }
}

/// Builds single-file torrents.
///
/// The builder holds only configuration, so one value can drive any number
/// of builds, including concurrent ones on different threads.
#[derive(Debug, Clone)]
pub struct TorrentBuilder {
    name: String,
    piece_length: i64,
    trackers: TrackerList,
    workers: usize,
    cancel: Option<CancellationToken>,
}

impl TorrentBuilder {
    /// `name` is the display name written to `info.name` and the magnet `dn`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            piece_length: DEFAULT_PIECE_LENGTH,
            trackers: TrackerList::new(),
            workers: 1,
            cancel: None,
        }
    }

    /// Piece length in bytes. Validated at build time; must be at least 1.
    pub fn piece_length(mut self, length: i64) -> Self {
        self.piece_length = length;
        self
    }

    pub fn trackers(mut self, trackers: TrackerList) -> Self {
        self.trackers = trackers;
        self
    }

    pub fn add_tracker(mut self, url: impl Into<String>) -> Self {
        self.trackers.push(url);
        self
    }

    /// Number of hashing threads for random-access sources. Streaming
    /// sources always hash on the calling thread.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Token checked before each piece read.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Builds from in-memory bytes.
    pub fn build(&self, data: &[u8]) -> Result<TorrentArtifact, MetainfoError> {
        self.build_from_source(data)
    }

    /// Builds from a sequential reader that yields exactly `length` bytes.
    pub fn build_from_reader<R: Read>(
        &self,
        reader: R,
        length: u64,
    ) -> Result<TorrentArtifact, MetainfoError> {
        let layout = self.layout(length)?;
        let pieces = hash_reader(reader, &layout, self.cancel.as_ref())?;
        self.assemble(&layout, pieces)
    }

    /// Builds from a random-access source, hashing on `workers` threads.
    pub fn build_from_source<S: PieceSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<TorrentArtifact, MetainfoError> {
        let layout = self.layout(source.len())?;
        let pieces = hash_source(source, &layout, self.workers, self.cancel.as_ref())?;
        self.assemble(&layout, pieces)
    }

    /// Opens `path` and builds from it.
    pub fn build_from_path(&self, path: impl AsRef<Path>) -> Result<TorrentArtifact, MetainfoError> {
        self.validate()?;
        let source = FileSource::open(path).map_err(MetainfoError::SourceRead)?;
        self.build_from_source(&source)
    }

    fn validate(&self) -> Result<PieceLength, MetainfoError> {
        let piece_length = PieceLength::new(self.piece_length)?;
        if self.name.is_empty() {
            return Err(MetainfoError::InvalidConfiguration(
                "torrent name must not be empty".into(),
            ));
        }
        if self.workers == 0 {
            return Err(MetainfoError::InvalidConfiguration(
                "at least one hashing worker is required".into(),
            ));
        }
        Ok(piece_length)
    }

    fn layout(&self, length: u64) -> Result<PieceLayout, MetainfoError> {
        let piece_length = self.validate()?;
        if i64::try_from(length).is_err() {
            return Err(MetainfoError::InvalidConfiguration(format!(
                "source of {length} bytes is too large to describe"
            )));
        }
        Ok(PieceLayout::new(length, piece_length))
    }

    fn assemble(&self, layout: &PieceLayout, pieces: Vec<u8>) -> Result<TorrentArtifact, MetainfoError> {
        debug_assert_eq!(pieces.len(), layout.pieces_field_len());

        let info = Value::dict([
            ("length", Value::Integer(layout.total_length() as i64)),
            ("name", Value::string(&self.name)),
            ("piece length", Value::Integer(layout.piece_length() as i64)),
            ("pieces", Value::from(pieces)),
        ]);
        let info_hash = InfoHash::of_info(&encode(&info).map_err(MetainfoError::Serialization)?);

        let mut root = BTreeMap::new();
        if let Some(announce) = self.trackers.announce() {
            root.insert(Bytes::from_static(b"announce"), announce);
        }
        if let Some(list) = self.trackers.announce_list() {
            root.insert(Bytes::from_static(b"announce-list"), list);
        }
        root.insert(Bytes::from_static(b"info"), info);

        let document = encode(&Value::Dict(root)).map_err(MetainfoError::Serialization)?;

        let magnet_uri = MagnetLink::new(info_hash)
            .with_name(self.name.as_str())
            .with_trackers(self.trackers.iter())
            .to_uri();

        tracing::debug!(
            name = %self.name,
            length = layout.total_length(),
            pieces = layout.piece_count(),
            %info_hash,
            "built torrent"
        );

        Ok(TorrentArtifact {
            document: Bytes::from(document),
            info_hash,
            magnet_uri,
            name: self.name.clone(),
            length: layout.total_length(),
            piece_length: layout.piece_length(),
            piece_count: layout.piece_count(),
        })
    }
}
