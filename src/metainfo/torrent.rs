use super::error::MetainfoError;
use super::info_hash::InfoHash;
use super::magnet::MagnetLink;
use super::pieces::{hash_source, PieceLayout, PieceLength, PieceSource, PIECE_HASH_LEN};
use crate::bencode::{decode, raw_dict_value, Value};
use bytes::Bytes;

/// A parsed single-file v1 torrent.
///
/// ```
/// use bdesk::metainfo::{Metainfo, TorrentBuilder};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let built = TorrentBuilder::new("hello.txt").build(b"hello")?;
/// let metainfo = Metainfo::from_bytes(&built.document)?;
///
/// assert_eq!(metainfo.info.name, "hello.txt");
/// assert_eq!(metainfo.info_hash, built.info_hash);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Metainfo {
    pub info: Info,
    /// SHA-1 of the `info` value exactly as it appears in the file.
    pub info_hash: InfoHash,
    pub announce: Option<String>,
    /// Tracker tiers ([BEP-12](http://bittorrent.org/beps/bep_0012.html)).
    pub announce_list: Vec<Vec<String>>,
    raw_info: Bytes,
}

/// The info dictionary of a single-file torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub name: String,
    pub piece_length: u64,
    pub pieces: Vec<[u8; 20]>,
    pub length: u64,
}

impl Info {
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn layout(&self) -> Result<PieceLayout, MetainfoError> {
        let piece_length = i64::try_from(self.piece_length)
            .map_err(|_| MetainfoError::InvalidField("piece length"))?;
        Ok(PieceLayout::new(self.length, PieceLength::new(piece_length)?))
    }
}

/// Outcome of checking a source against a torrent's piece hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub source_length: u64,
    pub expected_length: u64,
    /// Indices of pieces whose hash differs.
    pub mismatched: Vec<usize>,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        self.source_length == self.expected_length && self.mismatched.is_empty()
    }
}

impl Metainfo {
    /// Parses a `.torrent` document.
    ///
    /// # Errors
    ///
    /// Fails on invalid bencode, missing `info` fields, a non-positive piece
    /// length, a `pieces` field that is not a multiple of 20 bytes or does not
    /// match the piece count implied by `length`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let value = decode(data)?;
        let raw_info = raw_dict_value(data, b"info")?.ok_or(MetainfoError::MissingField("info"))?;
        let info = parse_info(value.get(b"info").ok_or(MetainfoError::MissingField("info"))?)?;

        let announce = value
            .get(b"announce")
            .and_then(Value::as_str)
            .map(String::from);

        let announce_list = value
            .get(b"announce-list")
            .and_then(Value::as_list)
            .map(|tiers| {
                tiers
                    .iter()
                    .filter_map(Value::as_list)
                    .map(|urls| {
                        urls.iter()
                            .filter_map(Value::as_str)
                            .map(String::from)
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            info,
            info_hash: InfoHash::of_info(raw_info),
            announce,
            announce_list,
            raw_info: Bytes::copy_from_slice(raw_info),
        })
    }

    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }

    /// `announce` first, then announce-list entries not seen yet.
    pub fn trackers(&self) -> Vec<String> {
        let mut trackers: Vec<String> = self.announce.iter().cloned().collect();
        for url in self.announce_list.iter().flatten() {
            if !trackers.contains(url) {
                trackers.push(url.clone());
            }
        }
        trackers
    }

    pub fn magnet(&self) -> MagnetLink {
        MagnetLink::new(self.info_hash)
            .with_name(self.info.name.as_str())
            .with_trackers(self.trackers())
    }

    /// Re-hashes `source` and compares it piece by piece.
    ///
    /// Pieces beyond the end of a short source count as mismatched.
    pub fn verify<S: PieceSource + ?Sized>(
        &self,
        source: &S,
        workers: usize,
    ) -> Result<Verification, MetainfoError> {
        let layout = self.info.layout()?;
        let source_length = source.len();
        let readable = layout
            .ranges()
            .take_while(|r| r.end <= source_length)
            .count();

        let mut mismatched = Vec::new();
        if readable > 0 {
            let prefix = PieceLayout::new(
                layout.piece_range(readable - 1).end,
                PieceLength::new(layout.piece_length() as i64)?,
            );
            let hashes = hash_source(source, &prefix, workers, None)?;
            for (index, (actual, expected)) in hashes
                .chunks_exact(PIECE_HASH_LEN)
                .zip(&self.info.pieces)
                .enumerate()
            {
                if actual != expected.as_slice() {
                    mismatched.push(index);
                }
            }
        }
        mismatched.extend(readable..layout.piece_count());

        if !mismatched.is_empty() {
            tracing::warn!(
                name = %self.info.name,
                bad = mismatched.len(),
                "source does not match torrent"
            );
        }

        Ok(Verification {
            source_length,
            expected_length: self.info.length,
            mismatched,
        })
    }
}

fn parse_info(value: &Value) -> Result<Info, MetainfoError> {
    let dict = value.as_dict().ok_or(MetainfoError::InvalidField("info"))?;

    let name = dict
        .get(b"name".as_slice())
        .ok_or(MetainfoError::MissingField("name"))?
        .as_str()
        .ok_or(MetainfoError::InvalidField("name"))?
        .to_string();

    let piece_length = dict
        .get(b"piece length".as_slice())
        .and_then(Value::as_integer)
        .ok_or(MetainfoError::MissingField("piece length"))?;
    if piece_length < 1 {
        return Err(MetainfoError::InvalidField("piece length"));
    }

    let length = dict
        .get(b"length".as_slice())
        .and_then(Value::as_integer)
        .ok_or(MetainfoError::MissingField("length"))?;
    let length = u64::try_from(length).map_err(|_| MetainfoError::InvalidField("length"))?;

    let pieces_bytes = dict
        .get(b"pieces".as_slice())
        .and_then(Value::as_bytes)
        .ok_or(MetainfoError::MissingField("pieces"))?;

    // Empty sources are written either with one hash of "" or with no hashes.
    let expected_pieces = if length == 0 {
        1
    } else {
        length.div_ceil(piece_length as u64)
    };
    let whole_hashes = pieces_bytes.len() % PIECE_HASH_LEN == 0;
    let hash_count = (pieces_bytes.len() / PIECE_HASH_LEN) as u64;
    let empty_without_hashes = length == 0 && pieces_bytes.is_empty();
    if !(whole_hashes && hash_count == expected_pieces) && !empty_without_hashes {
        return Err(MetainfoError::InvalidField("pieces"));
    }

    let pieces = pieces_bytes
        .chunks_exact(PIECE_HASH_LEN)
        .map(|chunk| {
            let mut arr = [0u8; 20];
            arr.copy_from_slice(chunk);
            arr
        })
        .collect();

    Ok(Info {
        name,
        piece_length: piece_length as u64,
        pieces,
        length,
    })
}
