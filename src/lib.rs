//! bdesk - torrent metadata builder and publisher
//!
//! Turns a file into a single-file BitTorrent v1 `.torrent` document, its
//! info-hash and a magnet URI, and publishes the result to a hosted backend.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 Bencode encoding/decoding
//! - [`metainfo`] - Piece hashing, torrent builder, info-hash, magnet links
//! - [`backend`] - Object storage, record store and identity collaborators
//! - [`publish`] - Upload, listing and deletion of published torrents
//! - [`config`] - `config.toml` loading

pub mod backend;
pub mod bencode;
pub mod config;
pub mod constants;
pub mod metainfo;
pub mod publish;

pub use bencode::{decode, encode, BencodeError, Value};
pub use config::{Config, ConfigError};
pub use metainfo::{
    Info, InfoHash, MagnetLink, Metainfo, MetainfoError, TorrentArtifact, TorrentBuilder,
    TrackerList,
};
pub use publish::{CreateTorrentRequest, PublishError, TorrentPublisher, TorrentSource};
