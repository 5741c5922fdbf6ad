//! Atomic persistence of the serialized document.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::BuildError;

/// Writes `payload` to `dest` atomically.
///
/// The bytes land in a temporary file in the destination directory, are
/// flushed to disk, and only then renamed over `dest`, so the destination
/// either does not exist or holds a complete document — even under crash or
/// cancellation. `cancelled` is consulted once more before the rename; a
/// cancelled write leaves nothing behind (the temp file is removed on every
/// non-renamed path).
///
/// # Errors
///
/// [`BuildError::Write`] with the destination path when the temp file cannot
/// be created, written, flushed, or renamed; [`BuildError::Cancelled`] when
/// the flag was observed set before the rename.
pub fn write_atomic(
    dest: &Path,
    payload: &[u8],
    cancelled: impl Fn() -> bool,
) -> Result<(), BuildError> {
    // The temp file must live in the destination directory for the rename
    // to stay atomic (same filesystem).
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BuildError::write(dest, e))?;
    tmp.write_all(payload)
        .map_err(|e| BuildError::write(dest, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| BuildError::write(dest, e))?;

    if cancelled() {
        return Err(BuildError::Cancelled);
    }

    tmp.persist(dest)
        .map_err(|e| BuildError::write(dest, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.torrent");

        write_atomic(&dest, b"d4:spam4:eggse", || false).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"d4:spam4:eggse");
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.torrent");
        fs::write(&dest, b"old").unwrap();

        write_atomic(&dest, b"new", || false).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn test_cancelled_write_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.torrent");

        let result = write_atomic(&dest, b"payload", || true);

        assert!(matches!(result, Err(BuildError::Cancelled)));
        assert!(!dest.exists());
        // No temp file litter either
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_directory_reports_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing").join("out.torrent");

        match write_atomic(&dest, b"payload", || false) {
            Err(BuildError::Write { path, .. }) => assert_eq!(path, dest),
            other => panic!("expected Write error, got {other:?}"),
        }
    }
}
