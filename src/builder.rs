//! The build task: walking, piece sizing, hashing, assembly and the atomic
//! write orchestrated as one cancellable background unit of work.
//!
//! The pipeline runs on a single worker; the invoking context only polls a
//! [`Snapshot`] and may flip the cancellation switch. Phases move strictly
//! forward, and only [`Phase::Hashing`] has intermediate progress.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::BuildError;
use crate::hasher;
use crate::manifest::Manifest;
use crate::metainfo::MetainfoDocument;
use crate::piece;
use crate::writer;

/// Options for a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Explicit piece length in bytes. Picked from the step table when
    /// unset; must be a positive multiple of [`piece::BLOCK_LENGTH`] when set.
    pub piece_length: Option<u32>,
    /// Announce URLs in order. The first becomes `announce`; the rest form
    /// `announce-list` tiers.
    pub trackers: Vec<String>,
    /// Optional comment stored in the document.
    pub comment: Option<String>,
    /// Restricts the torrent to its listed trackers. Requires at least one
    /// tracker.
    pub private: bool,
    /// Optional source tag (conventionally used by private trackers).
    pub source: Option<String>,
    /// Unix timestamp for `creation date`. Omitted from the document when
    /// unset, which keeps repeated builds byte-identical.
    pub creation_date: Option<i64>,
    /// `created by` string. Omitted when unset.
    pub created_by: Option<String>,
}

/// The phase a build task is in. Phases only move forward; `Done`, `Failed`
/// and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Walking,
    SizingPieces,
    Hashing,
    Assembling,
    Writing,
    Done,
    Failed,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed | Phase::Cancelled)
    }
}

/// A point-in-time view of a build task's progress.
///
/// Safe to read repeatedly until a terminal phase is observed.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub phase: Phase,
    /// Completed pieces; only advances during [`Phase::Hashing`].
    pub piece_index: u32,
    /// Total piece count; zero until the piece length is fixed.
    pub piece_count: u32,
}

/// Terminal result of a build task.
#[derive(Debug)]
pub enum Outcome {
    /// The document was written to `output`.
    Done {
        output: PathBuf,
        file_count: usize,
        total_length: u64,
        piece_count: u32,
        piece_length: u32,
    },
    /// The build failed; no output file exists.
    Failed(BuildError),
    /// The build was cancelled; no output file exists.
    Cancelled,
}

struct Shared {
    state: RwLock<Snapshot>,
    cancelled: AtomicBool,
}

/// Handle to a running build task.
///
/// The worker is the only writer of the shared state; the handle only reads
/// snapshots and sets the cancellation flag.
pub struct BuilderHandle {
    shared: Arc<Shared>,
    task: JoinHandle<Outcome>,
}

impl BuilderHandle {
    /// Spawns the build pipeline on the blocking thread pool.
    ///
    /// Must be called from within a tokio runtime. The returned handle polls
    /// and cancels; [`wait`](Self::wait) yields the terminal [`Outcome`].
    pub fn spawn(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        options: BuildOptions,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: RwLock::new(Snapshot {
                phase: Phase::Idle,
                piece_index: 0,
                piece_count: 0,
            }),
            cancelled: AtomicBool::new(false),
        });

        let worker = Worker {
            input: input.into(),
            output: output.into(),
            options,
            shared: Arc::clone(&shared),
        };
        let task = tokio::task::spawn_blocking(move || worker.run());

        BuilderHandle { shared, task }
    }

    /// The current progress snapshot.
    pub fn snapshot(&self) -> Snapshot {
        *self.shared.state.read()
    }

    /// Requests cancellation. Observed at the next piece boundary, or before
    /// the final rename; once the rename has happened the task still reports
    /// `Done`. Idempotent.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Relaxed);
    }

    /// Waits for the worker and returns its terminal outcome.
    pub async fn wait(self) -> Outcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(join) if join.is_cancelled() => Outcome::Cancelled,
            Err(join) => Outcome::Failed(BuildError::InvalidConfiguration(format!(
                "build worker panicked: {join}"
            ))),
        }
    }
}

struct Worker {
    input: PathBuf,
    output: PathBuf,
    options: BuildOptions,
    shared: Arc<Shared>,
}

impl Worker {
    fn run(self) -> Outcome {
        let outcome = match self.pipeline() {
            Ok(done) => done,
            Err(BuildError::Cancelled) => Outcome::Cancelled,
            Err(error) => Outcome::Failed(error),
        };

        self.set_phase(match outcome {
            Outcome::Done { .. } => Phase::Done,
            Outcome::Failed(_) => Phase::Failed,
            Outcome::Cancelled => Phase::Cancelled,
        });
        outcome
    }

    fn pipeline(&self) -> Result<Outcome, BuildError> {
        // A private document without trackers can never be used; refuse
        // before touching the filesystem.
        if self.options.private && self.options.trackers.is_empty() {
            return Err(BuildError::InvalidConfiguration(
                "no trackers specified for a private torrent".into(),
            ));
        }

        self.set_phase(Phase::Walking);
        let manifest = Manifest::scan(&self.input)?;

        self.set_phase(Phase::SizingPieces);
        let piece_length =
            piece::resolve_piece_length(manifest.total_length(), self.options.piece_length)?;
        let piece_count = manifest.piece_count(piece_length);
        self.shared.state.write().piece_count = piece_count;
        debug!(piece_length, piece_count, "piece length fixed");

        self.set_phase(Phase::Hashing);
        let shared = &self.shared;
        let pieces = hasher::hash_pieces(
            &manifest,
            piece_length,
            |completed| shared.state.write().piece_index = completed,
            || shared.cancelled.load(Ordering::Relaxed),
        )?;

        self.set_phase(Phase::Assembling);
        let document =
            MetainfoDocument::assemble(&manifest, piece_length, &pieces, &self.options)?;

        self.set_phase(Phase::Writing);
        writer::write_atomic(&self.output, &document.to_bytes(), || {
            shared.cancelled.load(Ordering::Relaxed)
        })?;
        debug!(output = %self.output.display(), "metainfo written");

        Ok(Outcome::Done {
            output: self.output.clone(),
            file_count: manifest.file_count(),
            total_length: manifest.total_length(),
            piece_count,
            piece_length,
        })
    }

    fn set_phase(&self, phase: Phase) {
        self.shared.state.write().phase = phase;
    }
}
