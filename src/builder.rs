use std::io::Write;
use std::path::PathBuf;

use crate::engine;
use crate::error::ScanError;
use crate::request::{GvkFilter, OutputMode, RecordFormat, ScanRequest};
use crate::results::ScanReport;
use crate::sink::Sink;

// ---------------------------------------------------------------------------
// ScanBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and executing a manifest scan.
///
/// Created via [`kindex::scan()`](crate::scan). Configure with chained
/// builder methods, then call [`run()`](ScanBuilder::run) with an output
/// writer to execute.
///
/// # Example
///
/// ```rust,ignore
/// let report = kindex::scan()
///     .root("deploy/")
///     .kind("Deployment")
///     .group("apps")
///     .version("v1")
///     .workers(8)
///     .run(&mut std::io::stdout())?;
/// ```
pub struct ScanBuilder {
    root: PathBuf,
    group: String,
    version: String,
    kind: String,
    branch_keywords: Vec<String>,
    workers: usize,
    git_enabled: bool,
    stream: bool,
    format: RecordFormat,
    json_array: bool,
}

impl Default for ScanBuilder {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            group: "*".into(),
            version: "*".into(),
            kind: String::new(),
            branch_keywords: Vec::new(),
            workers: default_workers(),
            git_enabled: true,
            stream: true,
            format: RecordFormat::Plain,
            json_array: false,
        }
    }
}

impl ScanBuilder {
    // ── Filters ───────────────────────────────────────────────────────────

    /// Root directory to walk. Defaults to the current directory.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// API group to match. `"*"` (the default) accepts any group; a concrete
    /// value must equal the group portion of `apiVersion` exactly.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// API version to match. `"*"` (the default) accepts any version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Kind to match. Required, always concrete, compared case-insensitively.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Keywords a branch name must contain (any one suffices) for the branch
    /// to be scanned. Keywords are lowercased; empty entries are dropped.
    /// An empty list scans every branch.
    pub fn branch_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.branch_keywords = keywords
            .into_iter()
            .map(|word| word.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        self
    }

    // ── Execution options ─────────────────────────────────────────────────

    /// Upper bound on concurrently spawned workers. Must be >= 1. Defaults
    /// to four per logical core — the work is subprocess- and IO-bound.
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    /// Enable or disable git branch scanning. Enabled by default; when
    /// disabled, `.git` directories are skipped entirely and only plain
    /// files on disk are matched.
    pub fn git(mut self, yes: bool) -> Self {
        self.git_enabled = yes;
        self
    }

    // ── Output ────────────────────────────────────────────────────────────

    /// Emit records as they are found (the default). Disabling buffers
    /// records instead: deduplicated, first completion wins, replayed once
    /// the scan finishes.
    pub fn stream(mut self, yes: bool) -> Self {
        self.stream = yes;
        self
    }

    /// Physical encoding of each record. Ignored by [`json_array`](Self::json_array).
    pub fn format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    /// Emit one pretty-printed JSON array of all records after the scan
    /// finishes. Implies buffering regardless of [`stream`](Self::stream).
    pub fn json_array(mut self, yes: bool) -> Self {
        self.json_array = yes;
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Validate the configuration, run the scan, and write matches to `out`.
    ///
    /// Blocks until every dispatched unit of work has settled.
    ///
    /// # Errors
    ///
    /// [`ScanError::InvalidConfig`] for a bad configuration (missing kind,
    /// nonexistent root, zero workers); otherwise the first fatal error the
    /// scan encountered, after in-flight work finishes.
    pub fn run<W: Write + Send>(self, out: &mut W) -> Result<ScanReport, ScanError> {
        let request = self.into_request()?;
        let sink = Sink::new(request.output, out);
        engine::run(&request, sink)
    }

    fn into_request(self) -> Result<ScanRequest, ScanError> {
        if self.kind.trim().is_empty() {
            return Err(ScanError::InvalidConfig("kind is required".into()));
        }
        if self.workers == 0 {
            return Err(ScanError::InvalidConfig(
                "workers must be at least 1".into(),
            ));
        }
        if !self.root.is_dir() {
            return Err(ScanError::InvalidConfig(format!(
                "root {} is not a readable directory",
                self.root.display()
            )));
        }

        // A single aggregate output, or streaming explicitly disabled,
        // requires the buffered regime.
        let output = if self.json_array {
            OutputMode::JsonArray
        } else if self.stream {
            OutputMode::Stream(self.format)
        } else {
            OutputMode::Buffered(self.format)
        };

        Ok(ScanRequest {
            root: self.root,
            filter: GvkFilter {
                group: self.group,
                version: self.version,
                kind: self.kind.trim().to_string(),
            },
            branch_keywords: self.branch_keywords,
            workers: self.workers,
            git_enabled: self.git_enabled,
            output,
        })
    }
}

/// Four workers per logical core, with a safe fallback.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 4)
        .unwrap_or(16)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_required() {
        let err = ScanBuilder::default().into_request().unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn zero_workers_rejected() {
        let err = ScanBuilder::default()
            .kind("Deployment")
            .workers(0)
            .into_request()
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn nonexistent_root_rejected() {
        let err = ScanBuilder::default()
            .kind("Deployment")
            .root("/definitely/not/a/real/path")
            .into_request()
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn keywords_are_lowercased_and_pruned() {
        let request = ScanBuilder::default()
            .kind("Deployment")
            .branch_keywords(["  FOO ", "", "Bar"])
            .into_request()
            .unwrap();
        assert_eq!(request.branch_keywords, vec!["foo", "bar"]);
    }

    #[test]
    fn json_array_forces_buffering() {
        let request = ScanBuilder::default()
            .kind("Deployment")
            .stream(true)
            .json_array(true)
            .into_request()
            .unwrap();
        assert_eq!(request.output, OutputMode::JsonArray);
    }

    #[test]
    fn disabling_stream_buffers_records() {
        let request = ScanBuilder::default()
            .kind("Deployment")
            .stream(false)
            .into_request()
            .unwrap();
        assert_eq!(request.output, OutputMode::Buffered(RecordFormat::Plain));
    }
}
