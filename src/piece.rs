//! Piece length selection.
//!
//! The piece length is fixed before hashing starts and never recomputed.
//! Without an override, a step table keyed by total input size keeps the
//! piece table proportionate to content size.

use crate::error::BuildError;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Smallest unit an explicit piece length must be a multiple of (16 KiB).
pub const BLOCK_LENGTH: u32 = 16 * KIB as u32;

/// Piece length picked for the smallest inputs (32 KiB).
pub const MIN_PIECE_LENGTH: u32 = 32 * KIB as u32;

/// Piece length cap for the largest inputs (2 MiB).
pub const MAX_PIECE_LENGTH: u32 = 2 * MIB as u32;

/// Picks the preferred piece length for a given total stream size.
///
/// Larger inputs get larger pieces, bounded by [`MIN_PIECE_LENGTH`] and
/// [`MAX_PIECE_LENGTH`]. The steps match what transmission-era clients pick.
pub fn preferred_piece_length(total_length: u64) -> u32 {
    if total_length >= 2 * GIB {
        MAX_PIECE_LENGTH
    } else if total_length >= GIB {
        MIB as u32
    } else if total_length >= 512 * MIB {
        512 * KIB as u32
    } else if total_length >= 350 * MIB {
        256 * KIB as u32
    } else if total_length >= 150 * MIB {
        128 * KIB as u32
    } else if total_length >= 50 * MIB {
        64 * KIB as u32
    } else {
        MIN_PIECE_LENGTH
    }
}

/// Resolves the piece length for a build: a validated explicit override, or
/// the preferred default for `total_length`.
///
/// # Errors
///
/// [`BuildError::InvalidConfiguration`] when the input is empty or the
/// override is not a positive multiple of [`BLOCK_LENGTH`].
pub fn resolve_piece_length(
    total_length: u64,
    override_length: Option<u32>,
) -> Result<u32, BuildError> {
    if total_length == 0 {
        return Err(BuildError::InvalidConfiguration(
            "input contains no data".into(),
        ));
    }

    match override_length {
        None => Ok(preferred_piece_length(total_length)),
        Some(length) if length == 0 || length % BLOCK_LENGTH != 0 => {
            Err(BuildError::InvalidConfiguration(format!(
                "piece length {length} is not a positive multiple of {BLOCK_LENGTH}"
            )))
        }
        Some(length) => Ok(length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_table() {
        assert_eq!(preferred_piece_length(1), MIN_PIECE_LENGTH);
        assert_eq!(preferred_piece_length(49 * MIB), MIN_PIECE_LENGTH);
        assert_eq!(preferred_piece_length(50 * MIB), 64 * KIB as u32);
        assert_eq!(preferred_piece_length(150 * MIB), 128 * KIB as u32);
        assert_eq!(preferred_piece_length(350 * MIB), 256 * KIB as u32);
        assert_eq!(preferred_piece_length(512 * MIB), 512 * KIB as u32);
        assert_eq!(preferred_piece_length(GIB), MIB as u32);
        assert_eq!(preferred_piece_length(2 * GIB), MAX_PIECE_LENGTH);
        assert_eq!(preferred_piece_length(100 * GIB), MAX_PIECE_LENGTH);
    }

    #[test]
    fn test_step_table_is_monotonic() {
        let sizes = [
            1,
            50 * MIB,
            150 * MIB,
            350 * MIB,
            512 * MIB,
            GIB,
            2 * GIB,
        ];
        let lengths: Vec<u32> = sizes.iter().map(|&s| preferred_piece_length(s)).collect();
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_override_must_be_block_multiple() {
        assert_eq!(resolve_piece_length(100, Some(BLOCK_LENGTH)).unwrap(), BLOCK_LENGTH);
        assert_eq!(
            resolve_piece_length(100, Some(4 * BLOCK_LENGTH)).unwrap(),
            4 * BLOCK_LENGTH
        );

        assert!(matches!(
            resolve_piece_length(100, Some(0)),
            Err(BuildError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            resolve_piece_length(100, Some(BLOCK_LENGTH + 1)),
            Err(BuildError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            resolve_piece_length(100, Some(1000)),
            Err(BuildError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(
            resolve_piece_length(0, None),
            Err(BuildError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            resolve_piece_length(0, Some(BLOCK_LENGTH)),
            Err(BuildError::InvalidConfiguration(_))
        ));
    }
}
