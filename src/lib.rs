//! torgen - torrent metainfo creation
//!
//! Builds v1 `.torrent` metainfo files from a single file or a directory
//! tree: the input is enumerated into a deterministic manifest, hashed in
//! fixed-size pieces across file boundaries with bounded memory, and
//! serialized to a bencoded document that is written atomically.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 bencode encoding
//! - [`manifest`] - input enumeration into an ordered file manifest
//! - [`piece`] - piece length selection
//! - [`hasher`] - streaming cross-file piece hashing
//! - [`metainfo`] - document assembly and serialization
//! - [`writer`] - atomic output persistence
//! - [`builder`] - the cancellable, progress-reporting build task
//!
//! # Example
//!
//! ```no_run
//! use torgen::{BuildOptions, BuilderHandle, Outcome};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let options = BuildOptions {
//!     trackers: vec!["http://tracker.example.com/announce".into()],
//!     ..BuildOptions::default()
//! };
//!
//! let handle = BuilderHandle::spawn("path/to/data", "data.torrent", options);
//! match handle.wait().await {
//!     Outcome::Done { piece_count, .. } => println!("{piece_count} pieces"),
//!     other => eprintln!("{other:?}"),
//! }
//! # }
//! ```

pub mod bencode;
pub mod builder;
pub mod error;
pub mod hasher;
pub mod manifest;
pub mod metainfo;
pub mod piece;
pub mod writer;

pub use builder::{BuildOptions, BuilderHandle, Outcome, Phase, Snapshot};
pub use error::BuildError;
pub use hasher::PieceTable;
pub use manifest::{FileEntry, Manifest};
pub use metainfo::MetainfoDocument;
