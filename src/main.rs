//! torgen CLI entry point.
//!
//! Thin shell around the build task: parses options, derives the output
//! path, prints progress while polling the task, and renders the terminal
//! result. All formatting lives here; the core never prints.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use torgen::{BuildError, BuildOptions, BuilderHandle, Outcome, Phase};

const KIB: u32 = 1024;

#[derive(Debug, Parser)]
#[command(
    name = "torgen",
    version,
    about = "Create a .torrent metainfo file from a file or directory"
)]
struct Cli {
    /// Input file or directory.
    input: PathBuf,

    /// Save the generated .torrent to this filename.
    #[arg(short, long, value_name = "FILE")]
    outfile: Option<PathBuf>,

    /// Add a tracker's announce URL (repeatable).
    #[arg(short, long = "tracker", value_name = "URL")]
    trackers: Vec<String>,

    /// Add a comment.
    #[arg(short, long)]
    comment: Option<String>,

    /// Allow this torrent to only be used with the specified tracker(s).
    #[arg(short, long)]
    private: bool,

    /// Set the source for private trackers.
    #[arg(short = 'r', long)]
    source: Option<String>,

    /// Set the piece size in KiB, overriding the preferred default.
    #[arg(short = 's', long = "piece-size", value_name = "KiB")]
    piece_size_kib: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let outfile = match cli.outfile.clone() {
        Some(path) => path,
        None => match derive_outfile(&cli.input) {
            Some(path) => path,
            None => {
                eprintln!(
                    "ERROR: cannot deduce output path from \"{}\"",
                    cli.input.display()
                );
                return ExitCode::FAILURE;
            }
        },
    };

    if cli.trackers.is_empty() && !cli.private {
        println!("WARNING: no trackers specified");
    }

    let options = BuildOptions {
        piece_length: cli.piece_size_kib.map(|kib| kib.saturating_mul(KIB)),
        trackers: cli.trackers,
        comment: cli.comment,
        private: cli.private,
        source: cli.source,
        creation_date: Some(unix_now()),
        created_by: Some(format!("torgen/{}", env!("CARGO_PKG_VERSION"))),
    };

    println!("Creating torrent \"{}\"", outfile.display());

    let handle = BuilderHandle::spawn(cli.input, outfile, options);
    let mut poll = tokio::time::interval(Duration::from_millis(500));
    let mut last_reported = None;

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let snapshot = handle.snapshot();
                if snapshot.phase.is_terminal() {
                    break;
                }
                if snapshot.phase == Phase::Hashing && last_reported != Some(snapshot.piece_index) {
                    print!("\rPiece {}/{} ...", snapshot.piece_index, snapshot.piece_count);
                    let _ = std::io::stdout().flush();
                    last_reported = Some(snapshot.piece_index);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
            }
        }
    }

    if last_reported.is_some() {
        println!();
    }

    match handle.wait().await {
        Outcome::Done {
            output,
            file_count,
            total_length,
            piece_count,
            piece_length,
        } => {
            println!(
                "{} {}, {} bytes",
                file_count,
                if file_count == 1 { "file" } else { "files" },
                total_length
            );
            println!(
                "{} {}, {} bytes each",
                piece_count,
                if piece_count == 1 { "piece" } else { "pieces" },
                piece_length
            );
            println!("done! wrote \"{}\"", output.display());
            ExitCode::SUCCESS
        }
        Outcome::Failed(error) => {
            report_failure(&error);
            ExitCode::FAILURE
        }
        Outcome::Cancelled => {
            println!("cancelled");
            ExitCode::FAILURE
        }
    }
}

/// Default output path: `<input basename>.torrent` in the current directory.
fn derive_outfile(input: &Path) -> Option<PathBuf> {
    let mut name = input.file_name()?.to_os_string();
    name.push(".torrent");
    Some(PathBuf::from(name))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn report_failure(error: &BuildError) {
    match error {
        BuildError::PathNotFound(path) => {
            eprintln!(
                "ERROR: cannot find specified input file or directory: \"{}\"",
                path.display()
            );
        }
        BuildError::Read { path, source } => {
            eprintln!("error reading \"{}\": {}", path.display(), source);
        }
        BuildError::Write { path, source } => {
            eprintln!("error writing \"{}\": {}", path.display(), source);
        }
        BuildError::InvalidConfiguration(reason) => {
            eprintln!("ERROR: {reason}");
        }
        BuildError::Cancelled => {
            eprintln!("cancelled");
        }
    }
}
