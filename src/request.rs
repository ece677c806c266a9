use std::path::PathBuf;

/// The group/version/kind filter applied to every parsed document.
///
/// `group` and `version` accept the literal wildcard token `"*"`; `kind` is
/// always concrete and matched case-insensitively.
#[derive(Debug, Clone)]
pub struct GvkFilter {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GvkFilter {
    pub(crate) fn group_accepts(&self, group: &str) -> bool {
        self.group == "*" || self.group == group
    }

    pub(crate) fn version_accepts(&self, version: &str) -> bool {
        self.version == "*" || self.version == version
    }
}

/// Physical encoding of a single match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Newline-terminated text.
    Plain,
    /// NUL-terminated text, for `xargs -0` style consumers.
    NullTerminated,
    /// One JSON object per line: `{"path": "..."}`.
    JsonLines,
}

/// How results leave the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Each record is written the moment it is produced. No deduplication,
    /// no ordering guarantee across concurrent producers.
    Stream(RecordFormat),
    /// Records accumulate (deduplicated, first completion wins) and are
    /// replayed in that order once all work has settled.
    Buffered(RecordFormat),
    /// One pretty-printed JSON array of all records, emitted after the scan
    /// finishes. Always buffered.
    JsonArray,
}

/// Everything the engine needs for one scan. Built and validated by
/// [`ScanBuilder`](crate::ScanBuilder); immutable for the scan's duration.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub root: PathBuf,
    pub filter: GvkFilter,
    /// Lowercase keywords, in declaration order. Empty keeps every branch.
    pub branch_keywords: Vec<String>,
    /// Upper bound on concurrently spawned workers. Always >= 1.
    pub workers: usize,
    /// When false, `.git` directories are skipped without scanning branches.
    pub git_enabled: bool,
    pub output: OutputMode,
}
