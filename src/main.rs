//! Command-line interface for the kindex scan engine.
//!
//! Flag parsing, logging setup and exit-code mapping live here; everything
//! else is the library. Exit codes: 0 success, 1 usage error, 2 scan failure.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use kindex::RecordFormat;

#[derive(Parser)]
#[command(name = "kindex", version)]
#[command(about = "Find Kubernetes manifests by group/version/kind across directories and git branches")]
struct Cli {
    /// Root directory to search
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Kubernetes Kind to match (required)
    #[arg(long)]
    kind: String,

    /// API group to match ("*" for any)
    #[arg(long, default_value = "*")]
    group: String,

    /// API version to match ("*" for any)
    #[arg(long = "api-version", default_value = "*")]
    api_version: String,

    /// Comma-separated keywords; a branch is scanned only if its name
    /// contains at least one of them
    #[arg(long = "branch-filters", value_delimiter = ',')]
    branch_filters: Vec<String>,

    /// Maximum concurrent git/YAML workers (default: 4x logical cores)
    #[arg(long = "max-procs")]
    max_procs: Option<usize>,

    /// Disable git branch scanning (disk files only)
    #[arg(long = "no-git")]
    no_git: bool,

    /// Emit results as they are found; --stream=false buffers, dedups and
    /// replays them once the scan finishes
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    stream: bool,

    /// NUL-terminate each record (for xargs -0)
    #[arg(short = '0', long = "null", conflicts_with_all = ["jsonl", "json"])]
    null_terminated: bool,

    /// Output newline-delimited JSON records
    #[arg(long, conflicts_with = "json")]
    jsonl: bool,

    /// Emit one final JSON array of records (non-streaming)
    #[arg(long)]
    json: bool,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let code: u8 = match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = error.print();
            return ExitCode::from(code);
        }
    };

    init_logging(cli.verbose);

    let format = if cli.null_terminated {
        RecordFormat::NullTerminated
    } else if cli.jsonl {
        RecordFormat::JsonLines
    } else {
        RecordFormat::Plain
    };

    let mut builder = kindex::scan()
        .root(cli.path)
        .kind(cli.kind)
        .group(cli.group)
        .version(cli.api_version)
        .branch_keywords(cli.branch_filters)
        .git(!cli.no_git)
        .stream(cli.stream)
        .format(format)
        .json_array(cli.json);
    if let Some(workers) = cli.max_procs {
        builder = builder.workers(workers);
    }

    match builder.run(&mut io::stdout()) {
        Ok(report) => {
            tracing::debug!(
                matches = report.matches,
                files = report.files,
                dirs = report.dirs,
                secs = report.duration.as_secs_f64(),
                "scan complete"
            );
            ExitCode::SUCCESS
        }
        Err(kindex::ScanError::InvalidConfig(message)) => {
            eprintln!("kindex: {message}");
            ExitCode::from(1)
        }
        Err(error) => {
            eprintln!("kindex: {error}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "kindex=debug" } else { "kindex=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
