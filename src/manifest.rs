//! Input enumeration: walks a file or a directory tree into an ordered
//! manifest of files with contiguous offsets in the virtual concatenated
//! byte stream.

use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BuildError;

/// A single file in the manifest.
///
/// Immutable once the manifest is built. Offsets are contiguous:
/// `entry[i].offset + entry[i].length == entry[i + 1].offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the manifest base directory.
    pub path: PathBuf,
    /// Length in bytes.
    pub length: u64,
    /// Start offset in the virtual concatenated stream.
    pub offset: u64,
}

impl FileEntry {
    pub fn byte_range(&self) -> Range<u64> {
        self.offset..self.offset + self.length
    }
}

/// The ordered enumeration of the input files.
///
/// Two scans of an unchanged tree produce identical manifests: directory
/// entries are visited depth-first and sorted by file name at each level,
/// so the piece table derived from the manifest is identical too.
#[derive(Debug, Clone)]
pub struct Manifest {
    name: String,
    base: PathBuf,
    files: Vec<FileEntry>,
    total_length: u64,
    single_file: bool,
}

impl Manifest {
    /// Walks `root` and builds the manifest.
    ///
    /// A single file becomes a one-entry manifest. A directory is recursed
    /// depth-first with entries sorted by name. An entry that cannot be
    /// stat'ed is fatal for the whole scan, never a skip: a silently missing
    /// file would corrupt every offset after it.
    ///
    /// # Errors
    ///
    /// [`BuildError::PathNotFound`] when `root` does not exist,
    /// [`BuildError::Read`] when traversal fails.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, BuildError> {
        let root = root.as_ref();
        let metadata = fs::metadata(root).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                BuildError::PathNotFound(root.to_path_buf())
            } else {
                BuildError::read(root, e)
            }
        })?;

        let name = scan_name(root)?;

        let manifest = if metadata.is_file() {
            let base = root.parent().unwrap_or(Path::new("")).to_path_buf();
            let entry = FileEntry {
                path: PathBuf::from(&name),
                length: metadata.len(),
                offset: 0,
            };
            Manifest {
                name,
                base,
                total_length: entry.length,
                files: vec![entry],
                single_file: true,
            }
        } else {
            let mut files = Vec::new();
            let mut offset = 0u64;
            walk_dir(root, PathBuf::new(), &mut files, &mut offset)?;
            Manifest {
                name,
                base: root.to_path_buf(),
                files,
                total_length: offset,
                single_file: false,
            }
        };

        debug!(
            name = %manifest.name,
            files = manifest.files.len(),
            total = manifest.total_length,
            "manifest built"
        );
        Ok(manifest)
    }

    /// The torrent name: the input's file or directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The files, in stream order.
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total length of the virtual concatenated stream.
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Whether the input was a single file rather than a directory.
    pub fn is_single_file(&self) -> bool {
        self.single_file
    }

    /// The on-disk path for a manifest entry.
    pub fn resolve(&self, entry: &FileEntry) -> PathBuf {
        self.base.join(&entry.path)
    }

    /// Number of pieces the stream partitions into at `piece_length`.
    pub fn piece_count(&self, piece_length: u32) -> u32 {
        self.total_length.div_ceil(u64::from(piece_length)) as u32
    }
}

/// Derives the manifest name from the root path, canonicalizing first when
/// the path has no usable final component (`.`, `/`, a trailing `..`).
fn scan_name(root: &Path) -> Result<String, BuildError> {
    let named = match root.file_name() {
        Some(name) => name.to_os_string(),
        None => {
            let canonical = root.canonicalize().map_err(|e| BuildError::read(root, e))?;
            canonical
                .file_name()
                .map(|n| n.to_os_string())
                .ok_or_else(|| {
                    BuildError::InvalidConfiguration(format!(
                        "cannot derive a torrent name from {}",
                        root.display()
                    ))
                })?
        }
    };
    named.into_string().map_err(|name| {
        BuildError::InvalidConfiguration(format!("input name is not valid UTF-8: {name:?}"))
    })
}

fn walk_dir(
    dir: &Path,
    relative: PathBuf,
    files: &mut Vec<FileEntry>,
    offset: &mut u64,
) -> Result<(), BuildError> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)
        .map_err(|e| BuildError::read(dir, e))?
        .collect::<Result<_, _>>()
        .map_err(|e| BuildError::read(dir, e))?;

    // Sort by name so the walk order never depends on the filesystem.
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| BuildError::read(&path, e))?;
        let child = relative.join(entry.file_name());

        if file_type.is_dir() {
            walk_dir(&path, child, files, offset)?;
        } else if file_type.is_file() {
            let metadata = entry.metadata().map_err(|e| BuildError::read(&path, e))?;
            push_file(files, offset, child, metadata.len());
        } else if file_type.is_symlink() {
            // Symlinked files are read through; symlinked directories are
            // not recursed into (cycle guard). A dangling link is fatal.
            let metadata = fs::metadata(&path).map_err(|e| BuildError::read(&path, e))?;
            if metadata.is_file() {
                push_file(files, offset, child, metadata.len());
            }
        }
    }

    Ok(())
}

fn push_file(files: &mut Vec<FileEntry>, offset: &mut u64, path: PathBuf, length: u64) {
    files.push(FileEntry {
        path,
        length,
        offset: *offset,
    });
    *offset += length;
}
