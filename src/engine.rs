use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::Scope;
use std::time::Instant;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::git::{self, GIT_DIR};
use crate::limiter::Limiter;
use crate::manifest;
use crate::request::ScanRequest;
use crate::results::ScanReport;
use crate::sink::Sink;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// First-error-wins cancellation shared by the walk thread and all workers.
///
/// The first fatal error flips the flag and is kept; work already running
/// finishes on its own, but dispatch declines to start anything new.
struct Control {
    cancelled: AtomicBool,
    first_error: Mutex<Option<ScanError>>,
}

impl Control {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            first_error: Mutex::new(None),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn fail(&self, error: ScanError) {
        warn!(%error, "scan cancelled");
        self.cancelled.store(true, Ordering::Release);
        if let Ok(mut slot) = self.first_error.lock() {
            slot.get_or_insert(error);
        }
    }

    fn into_result(self) -> Result<(), ScanError> {
        match self.first_error.into_inner() {
            Ok(Some(error)) => Err(error),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run `job` on a worker thread if a pool slot is free, inline otherwise.
///
/// Inline fallback is what keeps the single walking thread from deadlocking
/// against a saturated pool: there is always a synchronous path forward.
/// Failures land in `ctl` as the scan's first error.
fn dispatch<'scope, F>(
    scope: &'scope Scope<'scope, '_>,
    limiter: &'scope Limiter,
    ctl: &'scope Control,
    job: F,
) where
    F: FnOnce() -> Result<(), ScanError> + Send + 'scope,
{
    if ctl.is_cancelled() {
        return;
    }
    match limiter.try_acquire() {
        Some(token) => {
            scope.spawn(move || {
                let _token = token;
                if let Err(error) = job() {
                    ctl.fail(error);
                }
            });
        }
        None => {
            if let Err(error) = job() {
                ctl.fail(error);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Units of work
// ---------------------------------------------------------------------------

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

/// Match one plain file's content. Read failures are fatal, like any other
/// traversal failure.
fn inspect_file(path: &Path, request: &ScanRequest, sink: &Sink<'_>) -> Result<(), ScanError> {
    let data = fs::read(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if manifest::matches(&data, &request.filter) {
        debug!(path = %path.display(), "match");
        sink.push(path.display().to_string());
    }
    Ok(())
}

/// Enumerate a repository's branches and fan each kept branch back out
/// through the pool as its own unit of work.
fn scan_repo<'scope>(
    scope: &'scope Scope<'scope, '_>,
    limiter: &'scope Limiter,
    ctl: &'scope Control,
    repo: PathBuf,
    request: &'scope ScanRequest,
    sink: &'scope Sink<'_>,
) -> Result<(), ScanError> {
    let branches = git::list_branches(&repo)?;
    debug!(repo = %repo.display(), branches = branches.len(), "scanning repository");

    for branch in branches {
        if !git::branch_matches(&branch, &request.branch_keywords) {
            continue;
        }
        if ctl.is_cancelled() {
            break;
        }
        let repo = repo.clone();
        dispatch(scope, limiter, ctl, move || {
            git::scan_branch(&repo, &branch, request, sink)
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// run()
// ---------------------------------------------------------------------------

/// Execute one scan: walk the tree, dispatch work, join, flush.
///
/// Depth-first pre-order walk on the calling thread; repository scans,
/// branch scans and single-file matches run on pooled workers (or inline
/// when the pool is saturated). All dispatched work has settled by the time
/// this returns — `std::thread::scope` joins every worker.
///
/// With git scanning enabled, a `.git` directory marks its parent as a
/// repository root; the metadata subtree itself is not descended into, but
/// the surrounding working tree keeps being walked, so tracked manifests are
/// also visible as plain files. With git scanning disabled, `.git` gets no
/// special treatment at all and is walked like any other directory.
/// A repository nested inside another repository's working tree is scanned
/// like any other — nothing deduplicates the two (known limitation).
pub(crate) fn run(
    request: &ScanRequest,
    sink: Sink<'_>,
) -> Result<ScanReport, ScanError> {
    let limiter = Limiter::new(request.workers);
    let ctl = Control::new();
    let start = Instant::now();
    let mut files = 0usize;
    let mut dirs = 0usize;

    std::thread::scope(|scope| {
        let mut walk = WalkDir::new(&request.root).into_iter();
        while let Some(item) = walk.next() {
            if ctl.is_cancelled() {
                break;
            }
            let entry = match item {
                Ok(entry) => entry,
                Err(error) => {
                    // Fatal: stop dispatching, let in-flight work settle.
                    let path = error
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| request.root.clone());
                    let source = error
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walk error"));
                    ctl.fail(ScanError::Traversal { path, source });
                    break;
                }
            };

            if entry.file_type().is_dir() {
                dirs += 1;
                // With git scanning disabled, `.git` is walked like any
                // other directory; the skip belongs to the repo hand-off.
                if request.git_enabled && entry.file_name() == OsStr::new(GIT_DIR) {
                    walk.skip_current_dir();
                    let Some(repo) = entry.path().parent().map(Path::to_path_buf) else {
                        continue;
                    };
                    let (limiter, ctl, sink) = (&limiter, &ctl, &sink);
                    dispatch(scope, limiter, ctl, move || {
                        scan_repo(scope, limiter, ctl, repo, request, sink)
                    });
                }
                continue;
            }

            files += 1;
            if has_manifest_extension(entry.path()) {
                let path = entry.into_path();
                let sink = &sink;
                dispatch(scope, &limiter, &ctl, move || {
                    inspect_file(&path, request, sink)
                });
            }
        }
    });

    ctl.into_result()?;
    let matches = sink.matches();
    sink.finish();

    Ok(ScanReport {
        matches,
        files,
        dirs,
        duration: start.elapsed(),
    })
}
