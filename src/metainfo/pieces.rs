//! Piece geometry and SHA-1 piece hashing.
//!
//! A source of `L` bytes is cut into pieces of `P` bytes; only the last piece
//! may be shorter. A zero-length source still has one (empty) piece, so the
//! `pieces` field of a torrent is never empty.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

use bytes::Bytes;
use crossbeam::channel;
use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use tokio_util::sync::CancellationToken;

use super::error::MetainfoError;

/// Size of one SHA-1 piece hash.
pub const PIECE_HASH_LEN: usize = 20;

/// Validated piece length, always at least one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceLength(u64);

impl PieceLength {
    /// Accepts any signed value so callers can pass raw user input; zero and
    /// negatives are rejected.
    pub fn new(len: i64) -> Result<Self, MetainfoError> {
        if len < 1 {
            return Err(MetainfoError::InvalidConfiguration(format!(
                "piece length must be at least 1 byte, got {len}"
            )));
        }
        Ok(Self(len as u64))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Piece boundaries for a source of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceLayout {
    total_length: u64,
    piece_length: u64,
}

impl PieceLayout {
    pub fn new(total_length: u64, piece_length: PieceLength) -> Self {
        Self {
            total_length,
            piece_length: piece_length.get(),
        }
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    /// `ceil(L / P)`, or 1 when `L == 0`.
    pub fn piece_count(&self) -> usize {
        if self.total_length == 0 {
            return 1;
        }
        usize::try_from(self.total_length.div_ceil(self.piece_length)).unwrap_or(usize::MAX)
    }

    /// Byte range of piece `index`. Panics if `index >= piece_count()`.
    pub fn piece_range(&self, index: usize) -> Range<u64> {
        assert!(index < self.piece_count(), "piece index {index} out of range");
        let start = index as u64 * self.piece_length;
        let end = start.saturating_add(self.piece_length).min(self.total_length);
        start..end
    }

    pub fn piece_len(&self, index: usize) -> u64 {
        let range = self.piece_range(index);
        range.end - range.start
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<u64>> + '_ {
        (0..self.piece_count()).map(|i| self.piece_range(i))
    }

    /// Length of the hash buffer: 20 bytes per piece, saturating at
    /// `usize::MAX`.
    pub fn pieces_field_len(&self) -> usize {
        self.piece_count().saturating_mul(PIECE_HASH_LEN)
    }
}

/// A byte source that can be read at arbitrary offsets.
///
/// Implementations must be safe to share between hashing workers.
pub trait PieceSource: Send + Sync {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `buf` from `offset`. A short source is an error.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

impl PieceSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "offset past end"))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= <[u8]>::len(self))
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end"))?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }
}

impl PieceSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_slice().read_at(offset, buf)
    }
}

impl PieceSource for Bytes {
    fn len(&self) -> u64 {
        self.as_ref().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_ref().read_at(offset, buf)
    }
}

/// A file on disk used as a random-access source.
///
/// Reads are serialized through one handle; hashing still runs in parallel.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl PieceSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

fn hash_piece(data: &[u8]) -> [u8; PIECE_HASH_LEN] {
    Sha1::digest(data).into()
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<(), MetainfoError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(MetainfoError::Cancelled),
        _ => Ok(()),
    }
}

/// Hashes `layout.total_length()` bytes read sequentially from `reader`.
///
/// One piece-sized buffer is reused for the whole pass. A reader that ends
/// early, or still has bytes after the last piece, is reported as
/// [`MetainfoError::SourceRead`].
pub fn hash_reader<R: Read>(
    mut reader: R,
    layout: &PieceLayout,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u8>, MetainfoError> {
    let mut pieces = Vec::with_capacity(layout.pieces_field_len());
    let mut buf = vec![0u8; layout.piece_length().min(layout.total_length()) as usize];

    for index in 0..layout.piece_count() {
        check_cancelled(cancel)?;
        let len = layout.piece_len(index) as usize;
        let chunk = &mut buf[..len];
        reader.read_exact(chunk).map_err(MetainfoError::SourceRead)?;
        pieces.extend_from_slice(&hash_piece(chunk));
        tracing::trace!(piece = index, len, "hashed piece");
    }

    let mut extra = [0u8; 1];
    let overrun = loop {
        match reader.read(&mut extra) {
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MetainfoError::SourceRead(e)),
        }
    };
    if overrun > 0 {
        return Err(MetainfoError::SourceRead(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("source is longer than {} bytes", layout.total_length()),
        )));
    }

    Ok(pieces)
}

/// Hashes every piece of a random-access source.
///
/// With `workers > 1` the pieces are spread over a scoped pool; each result
/// lands in its own index slot so the output order never depends on
/// completion order. The first failure stops the remaining workers.
pub fn hash_source<S: PieceSource + ?Sized>(
    source: &S,
    layout: &PieceLayout,
    workers: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u8>, MetainfoError> {
    let count = layout.piece_count();
    let workers = workers.clamp(1, count);

    if workers == 1 {
        let mut pieces = Vec::with_capacity(layout.pieces_field_len());
        let mut buf = Vec::new();
        for index in 0..count {
            check_cancelled(cancel)?;
            pieces.extend_from_slice(&read_and_hash(source, layout, index, &mut buf)?);
        }
        return Ok(pieces);
    }

    tracing::debug!(pieces = count, workers, "hashing pieces in parallel");

    let (job_tx, job_rx) = channel::bounded::<usize>(workers * 2);
    let slots: Vec<Mutex<Option<[u8; PIECE_HASH_LEN]>>> = (0..count).map(|_| Mutex::new(None)).collect();
    let failure: Mutex<Option<MetainfoError>> = Mutex::new(None);
    let stop = CancellationToken::new();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let (slots, failure, stop) = (&slots, &failure, &stop);
            scope.spawn(move || {
                let mut buf = Vec::new();
                for index in job_rx.iter() {
                    if stop.is_cancelled() {
                        break;
                    }
                    if let Err(e) = check_cancelled(cancel) {
                        failure.lock().get_or_insert(e);
                        stop.cancel();
                        break;
                    }
                    match read_and_hash(source, layout, index, &mut buf) {
                        Ok(hash) => *slots[index].lock() = Some(hash),
                        Err(e) => {
                            failure.lock().get_or_insert(e);
                            stop.cancel();
                            break;
                        }
                    }
                }
            });
        }
        drop(job_rx);

        for index in 0..count {
            if stop.is_cancelled() {
                break;
            }
            if let Err(e) = check_cancelled(cancel) {
                failure.lock().get_or_insert(e);
                stop.cancel();
                break;
            }
            if job_tx.send(index).is_err() {
                break;
            }
        }
        drop(job_tx);
    });

    if let Some(e) = failure.into_inner() {
        return Err(e);
    }

    let mut pieces = Vec::with_capacity(layout.pieces_field_len());
    for (index, slot) in slots.into_iter().enumerate() {
        let hash = slot.into_inner().ok_or_else(|| {
            MetainfoError::SourceRead(io::Error::other(format!("piece {index} was not hashed")))
        })?;
        pieces.extend_from_slice(&hash);
    }
    Ok(pieces)
}

fn read_and_hash<S: PieceSource + ?Sized>(
    source: &S,
    layout: &PieceLayout,
    index: usize,
    buf: &mut Vec<u8>,
) -> Result<[u8; PIECE_HASH_LEN], MetainfoError> {
    let range = layout.piece_range(index);
    buf.resize((range.end - range.start) as usize, 0);
    source
        .read_at(range.start, buf)
        .map_err(MetainfoError::SourceRead)?;
    Ok(hash_piece(buf))
}
