//! Streaming piece hashing.
//!
//! The manifest's files are treated as one logical concatenated byte stream.
//! Exactly one piece-sized buffer is held in memory; a piece that straddles a
//! file boundary keeps filling from the next file before it is hashed, so
//! memory use is O(piece length) no matter how large the input is.

use std::cmp;
use std::fs::File;
use std::io::Read;

use sha1::{Digest, Sha1};

use crate::error::BuildError;
use crate::manifest::Manifest;

/// The ordered table of per-piece SHA-1 digests.
///
/// Grows monotonically, one digest appended per completed piece, in read
/// order. Index order is assignment order; nothing is ever reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceTable(Vec<[u8; 20]>);

impl PieceTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The digests in index order.
    pub fn digests(&self) -> &[[u8; 20]] {
        &self.0
    }

    /// Digests concatenated in index order, the form stored in the document.
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * 20);
        for digest in &self.0 {
            out.extend_from_slice(digest);
        }
        out
    }

    fn push(&mut self, digest: [u8; 20]) {
        self.0.push(digest);
    }
}

/// Hashes the manifest's concatenated byte stream into one digest per piece.
///
/// Reads exactly one piece worth of bytes at a time regardless of which
/// file(s) they originate from; the final piece may be shorter. `on_piece`
/// is invoked with the number of completed pieces after each digest, and
/// `cancelled` is consulted once per piece boundary, so a cancellation
/// request is honored within one piece-hash duration.
///
/// # Errors
///
/// [`BuildError::Read`] aborts immediately with the failing file's path,
/// discarding the partial table; a file whose on-disk size no longer matches
/// the manifest surfaces the same way. [`BuildError::Cancelled`] when the
/// flag was observed set.
pub fn hash_pieces(
    manifest: &Manifest,
    piece_length: u32,
    mut on_piece: impl FnMut(u32),
    cancelled: impl Fn() -> bool,
) -> Result<PieceTable, BuildError> {
    let piece_count = manifest.piece_count(piece_length) as usize;
    let mut table = PieceTable(Vec::with_capacity(piece_count));
    let mut buf = vec![0u8; piece_length as usize];
    let mut filled = 0usize;

    for entry in manifest.files() {
        if entry.length == 0 {
            continue;
        }
        let path = manifest.resolve(entry);
        let mut file = File::open(&path).map_err(|e| BuildError::read(&path, e))?;
        let mut remaining = entry.length;

        while remaining > 0 {
            let want = cmp::min((buf.len() - filled) as u64, remaining) as usize;
            file.read_exact(&mut buf[filled..filled + want])
                .map_err(|e| BuildError::read(&path, e))?;
            filled += want;
            remaining -= want as u64;

            if filled == buf.len() {
                if cancelled() {
                    return Err(BuildError::Cancelled);
                }
                table.push(digest(&buf));
                filled = 0;
                on_piece(table.len() as u32);
            }
        }
    }

    // The final piece is bounded by the total length, not the piece length.
    if filled > 0 {
        if cancelled() {
            return Err(BuildError::Cancelled);
        }
        table.push(digest(&buf[..filled]));
        on_piece(table.len() as u32);
    }

    debug_assert_eq!(table.len(), piece_count);
    Ok(table)
}

fn digest(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}
