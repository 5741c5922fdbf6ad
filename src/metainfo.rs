//! Metainfo document assembly and serialization.
//!
//! Assembly happens once, after hashing succeeds, and the result is
//! immutable. Tracker validation lives here rather than earlier: a bad
//! announce URL only matters once there is a piece table to publish.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::bencode::{encode, Value};
use crate::builder::BuildOptions;
use crate::error::BuildError;
use crate::hasher::PieceTable;
use crate::manifest::Manifest;

/// An assembled, immutable metainfo document.
///
/// Holds the complete bencode tree; [`to_bytes`](Self::to_bytes) serializes
/// it. Dictionary keys are sorted by construction, so the same inputs always
/// produce byte-identical output.
#[derive(Debug, Clone)]
pub struct MetainfoDocument {
    root: Value,
}

impl MetainfoDocument {
    /// Assembles the document from the manifest, piece table and options.
    ///
    /// Single-file manifests fold the name into a top-level `length`;
    /// multi-file manifests emit a `files` list of `{length, path}` dicts.
    /// `announce` is the first tracker; with more than one tracker each URL
    /// becomes its own tier in `announce-list`. Optional comment, source,
    /// private, creation-date and created-by fields are attached only when
    /// provided.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidConfiguration`] for a malformed tracker URL, a
    /// private document without trackers, or a non-UTF-8 file name.
    pub fn assemble(
        manifest: &Manifest,
        piece_length: u32,
        pieces: &PieceTable,
        options: &BuildOptions,
    ) -> Result<Self, BuildError> {
        // A private document is unusable without at least one tracker.
        if options.private && options.trackers.is_empty() {
            return Err(BuildError::InvalidConfiguration(
                "no trackers specified for a private torrent".into(),
            ));
        }
        for url in &options.trackers {
            if !validate_announce_url(url) {
                return Err(BuildError::InvalidConfiguration(format!(
                    "bad announce URL: \"{url}\""
                )));
            }
        }

        let mut root = BTreeMap::new();
        root.insert(
            Bytes::from_static(b"info"),
            build_info(manifest, piece_length, pieces, options)?,
        );

        if let Some(announce) = options.trackers.first() {
            root.insert(Bytes::from_static(b"announce"), Value::string(announce));
        }
        if options.trackers.len() > 1 {
            let tiers: Vec<Value> = options
                .trackers
                .iter()
                .map(|url| Value::List(vec![Value::string(url)]))
                .collect();
            root.insert(Bytes::from_static(b"announce-list"), Value::List(tiers));
        }

        if let Some(ref comment) = options.comment {
            root.insert(Bytes::from_static(b"comment"), Value::string(comment));
        }
        if let Some(ref created_by) = options.created_by {
            root.insert(Bytes::from_static(b"created by"), Value::string(created_by));
        }
        if let Some(creation_date) = options.creation_date {
            root.insert(
                Bytes::from_static(b"creation date"),
                Value::Integer(creation_date),
            );
        }

        Ok(MetainfoDocument {
            root: Value::Dict(root),
        })
    }

    /// Serializes the document to its canonical bencoded form.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.root)
    }
}

fn build_info(
    manifest: &Manifest,
    piece_length: u32,
    pieces: &PieceTable,
    options: &BuildOptions,
) -> Result<Value, BuildError> {
    let mut info = BTreeMap::new();

    info.insert(Bytes::from_static(b"name"), Value::string(manifest.name()));
    info.insert(
        Bytes::from_static(b"piece length"),
        Value::Integer(i64::from(piece_length)),
    );
    info.insert(
        Bytes::from_static(b"pieces"),
        Value::Bytes(Bytes::from(pieces.concat())),
    );

    if options.private {
        info.insert(Bytes::from_static(b"private"), Value::Integer(1));
    }
    if let Some(ref source) = options.source {
        info.insert(Bytes::from_static(b"source"), Value::string(source));
    }

    if manifest.is_single_file() {
        info.insert(
            Bytes::from_static(b"length"),
            Value::Integer(manifest.total_length() as i64),
        );
    } else {
        info.insert(
            Bytes::from_static(b"files"),
            Value::List(build_files_list(manifest)?),
        );
    }

    Ok(Value::Dict(info))
}

fn build_files_list(manifest: &Manifest) -> Result<Vec<Value>, BuildError> {
    manifest
        .files()
        .iter()
        .map(|entry| {
            let components: Vec<Value> = entry
                .path
                .components()
                .map(|c| {
                    c.as_os_str().to_str().map(Value::string).ok_or_else(|| {
                        BuildError::InvalidConfiguration(format!(
                            "file name is not valid UTF-8: {}",
                            entry.path.display()
                        ))
                    })
                })
                .collect::<Result<_, _>>()?;

            let mut file = BTreeMap::new();
            file.insert(
                Bytes::from_static(b"length"),
                Value::Integer(entry.length as i64),
            );
            file.insert(Bytes::from_static(b"path"), Value::List(components));
            Ok(Value::Dict(file))
        })
        .collect()
}

/// Checks that an announce URL has a usable scheme and a non-empty host.
fn validate_announce_url(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    if !matches!(scheme, "http" | "https" | "udp") {
        return false;
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = host.split(':').next().unwrap_or("");
    !host.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_pieces;
    use sha1::{Digest, Sha1};
    use std::fs;
    use tempfile::TempDir;

    fn options_with_tracker() -> BuildOptions {
        BuildOptions {
            trackers: vec!["http://tracker.example.com/announce".into()],
            ..BuildOptions::default()
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_single_file_document_exact_bytes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"abcd").unwrap();

        let manifest = Manifest::scan(dir.path().join("a.bin")).unwrap();
        let pieces = hash_pieces(&manifest, 16384, |_| {}, || false).unwrap();
        let doc =
            MetainfoDocument::assemble(&manifest, 16384, &pieces, &options_with_tracker())
                .unwrap();

        let digest: [u8; 20] = {
            let mut hasher = Sha1::new();
            hasher.update(b"abcd");
            hasher.finalize().into()
        };
        let mut expected = Vec::new();
        expected.extend_from_slice(b"d8:announce35:http://tracker.example.com/announce");
        expected
            .extend_from_slice(b"4:infod6:lengthi4e4:name5:a.bin12:piece lengthi16384e6:pieces20:");
        expected.extend_from_slice(&digest);
        expected.extend_from_slice(b"ee");

        assert_eq!(doc.to_bytes(), expected);
    }

    #[test]
    fn test_multi_file_document_shape() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"aaaa").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.bin"), b"bb").unwrap();

        let manifest = Manifest::scan(dir.path()).unwrap();
        let pieces = hash_pieces(&manifest, 16384, |_| {}, || false).unwrap();
        let doc =
            MetainfoDocument::assemble(&manifest, 16384, &pieces, &options_with_tracker())
                .unwrap();
        let bytes = doc.to_bytes();

        // Multi-file: a files list instead of a top-level length
        assert!(contains(&bytes, b"5:filesl"));
        assert!(contains(&bytes, b"d6:lengthi4e4:pathl5:a.binee"));
        assert!(contains(&bytes, b"d6:lengthi2e4:pathl3:sub5:b.binee"));
        assert!(!contains(&bytes, b"6:lengthi6e"));
    }

    #[test]
    fn test_optional_fields_attached_only_when_provided() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"abcd").unwrap();
        let manifest = Manifest::scan(dir.path().join("a.bin")).unwrap();
        let pieces = hash_pieces(&manifest, 16384, |_| {}, || false).unwrap();

        let bare =
            MetainfoDocument::assemble(&manifest, 16384, &pieces, &options_with_tracker())
                .unwrap();
        let bare_bytes = bare.to_bytes();
        assert!(!contains(&bare_bytes, b"7:comment"));
        assert!(!contains(&bare_bytes, b"7:private"));
        assert!(!contains(&bare_bytes, b"6:source"));
        assert!(!contains(&bare_bytes, b"13:creation date"));

        let full_options = BuildOptions {
            trackers: vec!["http://tracker.example.com/announce".into()],
            comment: Some("a comment".into()),
            private: true,
            source: Some("EXAMPLE".into()),
            creation_date: Some(1_600_000_000),
            created_by: Some("torgen/0.1.0".into()),
            ..BuildOptions::default()
        };
        let full =
            MetainfoDocument::assemble(&manifest, 16384, &pieces, &full_options).unwrap();
        let full_bytes = full.to_bytes();
        assert!(contains(&full_bytes, b"7:comment9:a comment"));
        assert!(contains(&full_bytes, b"7:privatei1e"));
        assert!(contains(&full_bytes, b"6:source7:EXAMPLE"));
        assert!(contains(&full_bytes, b"13:creation datei1600000000e"));
        assert!(contains(&full_bytes, b"10:created by12:torgen/0.1.0"));
    }

    #[test]
    fn test_announce_list_tiers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"abcd").unwrap();
        let manifest = Manifest::scan(dir.path().join("a.bin")).unwrap();
        let pieces = hash_pieces(&manifest, 16384, |_| {}, || false).unwrap();

        let options = BuildOptions {
            trackers: vec![
                "http://one.example/announce".into(),
                "udp://two.example:6969/announce".into(),
            ],
            ..BuildOptions::default()
        };
        let doc = MetainfoDocument::assemble(&manifest, 16384, &pieces, &options).unwrap();
        let bytes = doc.to_bytes();

        assert!(contains(&bytes, b"8:announce27:http://one.example/announce"));
        assert!(contains(
            &bytes,
            b"13:announce-listll27:http://one.example/announceel31:udp://two.example:6969/announceee"
        ));
    }

    #[test]
    fn test_bad_announce_url_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"abcd").unwrap();
        let manifest = Manifest::scan(dir.path().join("a.bin")).unwrap();
        let pieces = hash_pieces(&manifest, 16384, |_| {}, || false).unwrap();

        for bad in [
            "not a url",
            "ftp://tracker.example.com/announce",
            "http://",
            "http:///announce",
            "://tracker.example.com",
        ] {
            let options = BuildOptions {
                trackers: vec![bad.into()],
                ..BuildOptions::default()
            };
            assert!(
                matches!(
                    MetainfoDocument::assemble(&manifest, 16384, &pieces, &options),
                    Err(BuildError::InvalidConfiguration(_))
                ),
                "expected rejection of {bad:?}"
            );
        }
    }

    #[test]
    fn test_private_without_trackers_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"abcd").unwrap();
        let manifest = Manifest::scan(dir.path().join("a.bin")).unwrap();
        let pieces = hash_pieces(&manifest, 16384, |_| {}, || false).unwrap();

        let options = BuildOptions {
            private: true,
            ..BuildOptions::default()
        };
        assert!(matches!(
            MetainfoDocument::assemble(&manifest, 16384, &pieces, &options),
            Err(BuildError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_tracker_list_is_allowed_when_not_private() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"abcd").unwrap();
        let manifest = Manifest::scan(dir.path().join("a.bin")).unwrap();
        let pieces = hash_pieces(&manifest, 16384, |_| {}, || false).unwrap();

        let doc =
            MetainfoDocument::assemble(&manifest, 16384, &pieces, &BuildOptions::default())
                .unwrap();
        assert!(!contains(&doc.to_bytes(), b"8:announce"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"aaaa").unwrap();
        fs::write(dir.path().join("b.bin"), b"bbbb").unwrap();

        let manifest = Manifest::scan(dir.path()).unwrap();
        let pieces = hash_pieces(&manifest, 16384, |_| {}, || false).unwrap();
        let options = BuildOptions {
            trackers: vec!["http://tracker.example.com/announce".into()],
            comment: Some("same".into()),
            creation_date: Some(1_600_000_000),
            ..BuildOptions::default()
        };

        let first = MetainfoDocument::assemble(&manifest, 16384, &pieces, &options)
            .unwrap()
            .to_bytes();
        let second = MetainfoDocument::assemble(&manifest, 16384, &pieces, &options)
            .unwrap()
            .to_bytes();
        assert_eq!(first, second);
    }

    #[test]
    fn test_validate_announce_url() {
        assert!(validate_announce_url("http://tracker.example.com/announce"));
        assert!(validate_announce_url(
            "https://tracker.example.com:443/announce"
        ));
        assert!(validate_announce_url("udp://tracker.example.com:6969"));
        assert!(validate_announce_url("http://user@tracker.example.com/a"));

        assert!(!validate_announce_url("tracker.example.com"));
        assert!(!validate_announce_url("ws://tracker.example.com"));
        assert!(!validate_announce_url("http://"));
        assert!(!validate_announce_url("udp://:6969"));
    }
}
