//! Torrent metainfo ([BEP-3]): building, reading and verifying single-file
//! v1 torrents, plus magnet links ([BEP-9]).
//!
//! # Building
//!
//! [`TorrentBuilder`] turns a source and a configuration (piece length,
//! trackers) into a [`TorrentArtifact`]: the bencoded document, its info
//! hash, and a magnet URI.
//!
//! ```
//! use bdesk::metainfo::{TorrentBuilder, TrackerList};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = TorrentBuilder::new("notes.txt")
//!     .piece_length(262144)
//!     .trackers(TrackerList::parse("udp://tracker.opentrackr.org:1337/announce"))
//!     .build(b"some file contents")?;
//!
//! println!("{}", torrent.info_hash);
//! println!("{}", torrent.magnet_uri);
//! # Ok(())
//! # }
//! ```
//!
//! # Document layout
//!
//! ```text
//! d
//!   8:announce       first tracker            (omitted with no trackers)
//!   13:announce-list [[t1], [t2], ...]        (omitted with < 2 trackers)
//!   4:info d
//!     6:length       total bytes
//!     4:name         display name
//!     12:piece length
//!     6:pieces       20-byte SHA-1 per piece, in order
//!   e
//! e
//! ```
//!
//! The info hash is the SHA-1 of the bencoded `info` dictionary alone.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html
//! [BEP-9]: http://bittorrent.org/beps/bep_0009.html

mod builder;
mod error;
mod info_hash;
mod magnet;
mod pieces;
mod torrent;
mod trackers;

pub use builder::{TorrentArtifact, TorrentBuilder};
pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use magnet::MagnetLink;
pub use pieces::{
    hash_reader, hash_source, FileSource, PieceLayout, PieceLength, PieceSource, PIECE_HASH_LEN,
};
pub use torrent::{Info, Metainfo, Verification};
pub use trackers::TrackerList;

#[cfg(test)]
mod tests;
