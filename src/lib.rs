//! # kindex
//!
//! Parallel Kubernetes manifest locator — search directories and git branches
//! by group/version/kind.
//!
//! kindex walks a filesystem subtree looking for YAML manifests whose
//! `apiVersion`/`kind` identity matches a group/version/kind filter. When it
//! finds a git repository along the way it also searches every branch of that
//! repository — local and remote — using `git grep` as a cheap shortlist and
//! fetching candidate blobs with `git show`, so a manifest that only exists
//! on a feature branch is still found.
//!
//! # Quick Start
//!
//! ```no_run
//! let report = kindex::scan()
//!     .root("deploy/")
//!     .kind("Deployment")
//!     .group("apps")
//!     .version("v1")
//!     .run(&mut std::io::stdout())
//!     .unwrap();
//!
//! eprintln!("{} matches in {:.3}s", report.matches, report.duration.as_secs_f64());
//! ```
//!
//! Records are plain paths for on-disk files and `repo:branch:path` for
//! matches found on a branch. Output can stream (newline-, NUL-terminated or
//! JSON lines) or buffer into one deduplicated JSON array:
//!
//! ```no_run
//! use kindex::RecordFormat;
//!
//! kindex::scan()
//!     .kind("ConfigMap")
//!     .stream(true)
//!     .format(RecordFormat::JsonLines)
//!     .run(&mut std::io::stdout())
//!     .unwrap();
//! ```
//!
//! # Concurrency
//!
//! One thread walks the tree; repository scans, branch scans and file
//! matches fan out to a bounded worker pool. The pool is non-blocking — when
//! it is saturated the walking thread runs the work itself, so a scan can
//! never deadlock, even with a single worker. The scan returns once every
//! dispatched unit of work has settled.
//!
//! # Failure policy
//!
//! Malformed YAML documents and unfetchable blobs are skipped silently;
//! filesystem walk errors and unexpected git failures cancel the scan and
//! surface as the scan's result. Nothing is retried.

#![forbid(unsafe_code)]

mod builder;
mod engine;
mod error;
mod git;
mod limiter;
mod manifest;
mod request;
mod results;
mod sink;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::ScanBuilder;
pub use error::ScanError;
pub use request::{GvkFilter, OutputMode, RecordFormat, ScanRequest};
pub use results::ScanReport;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`ScanBuilder`] to configure and run a scan.
///
/// # Example
///
/// ```no_run
/// let report = kindex::scan()
///     .root(".")
///     .kind("Service")
///     .run(&mut std::io::stdout())
///     .unwrap();
///
/// assert!(report.matches < usize::MAX);
/// ```
pub fn scan() -> ScanBuilder {
    ScanBuilder::default()
}
