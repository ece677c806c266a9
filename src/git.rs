//! Branch enumeration and per-branch content scanning.
//!
//! Git is driven purely as a subprocess — three operations only: list branch
//! refs, `git grep` at a revision, `git show` a blob. No object-model access.

use std::path::Path;
use std::process::{Command, Output};

use tracing::{debug, trace};

use crate::error::ScanError;
use crate::manifest;
use crate::request::ScanRequest;
use crate::sink::Sink;

/// Directory name that marks a repository root.
pub(crate) const GIT_DIR: &str = ".git";

/// Pathspecs limiting `git grep` to structured files.
const MANIFEST_PATHSPECS: [&str; 2] = ["*.yaml", "*.yml"];

/// `git grep` exits 1 when nothing matched. Defined signal, not an error.
const GREP_NO_HITS: i32 = 1;

fn git_output(repo: &Path, args: &[&str]) -> Result<Output, ScanError> {
    Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(ScanError::GitSpawn)
}

fn git_failure(op: &'static str, repo: &Path, output: &Output) -> ScanError {
    ScanError::Git {
        op,
        repo: repo.to_path_buf(),
        detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Branch enumeration
// ---------------------------------------------------------------------------

/// List local and remote branch short names for `repo`.
///
/// Symbolic remote HEAD refs are excluded by the ref listing itself; alias
/// lines of the form `A -> B` are filtered out afterwards. Order is whatever
/// the ref listing yields.
pub(crate) fn list_branches(repo: &Path) -> Result<Vec<String>, ScanError> {
    let output = git_output(
        repo,
        &[
            "for-each-ref",
            "--exclude=refs/remotes/*/HEAD",
            "--format=%(refname:short)",
            "refs/heads",
            "refs/remotes",
        ],
    )?;
    if !output.status.success() {
        return Err(git_failure("for-each-ref", repo, &output));
    }
    Ok(parse_branch_list(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_branch_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(" -> "))
        .map(String::from)
        .collect()
}

/// A branch is kept iff the keyword list is empty, or its lowercase name
/// contains at least one keyword as a substring.
pub(crate) fn branch_matches(branch: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let branch = branch.to_lowercase();
    keywords.iter().any(|word| branch.contains(word.as_str()))
}

// ---------------------------------------------------------------------------
// Per-branch scan
// ---------------------------------------------------------------------------

/// Scan one branch: shortlist candidate files with `git grep`, fetch each
/// blob with `git show`, and hand the content to the document matcher.
///
/// The grep is a cheap over-approximation — it returns every file that could
/// match, never rejects one that would. Blob fetch failures (paths renamed
/// or deleted across history) skip that file; only an unexpected grep
/// failure aborts the branch.
pub(crate) fn scan_branch(
    repo: &Path,
    branch: &str,
    request: &ScanRequest,
    sink: &Sink<'_>,
) -> Result<(), ScanError> {
    let pattern = format!("kind:[[:space:]]*{}\\b", request.filter.kind);
    let mut args = vec!["grep", "-I", "-l", "-z", "-i", "-e", pattern.as_str(), branch, "--"];
    args.extend(MANIFEST_PATHSPECS);

    let output = git_output(repo, &args)?;
    if !output.status.success() {
        if output.status.code() == Some(GREP_NO_HITS) {
            trace!(repo = %repo.display(), branch, "no shortlist hits");
            return Ok(());
        }
        return Err(git_failure("grep", repo, &output));
    }

    for raw in output.stdout.split(|byte| *byte == 0) {
        if raw.is_empty() {
            continue;
        }
        let entry = String::from_utf8_lossy(raw);
        let path = strip_revision_prefix(&entry, branch);

        // Fetch the blob exactly as stored at this branch's revision. Any
        // failure here is tolerated: skip the file, not the branch.
        let spec = format!("{branch}:{path}");
        let blob = match git_output(repo, &["show", spec.as_str()]) {
            Ok(output) if output.status.success() => output.stdout,
            Ok(_) | Err(_) => {
                trace!(repo = %repo.display(), %spec, "blob fetch failed, skipping");
                continue;
            }
        };

        if manifest::matches(&blob, &request.filter) {
            debug!(repo = %repo.display(), branch, path = %path, "match");
            sink.push(format!("{}:{}:{}", repo.display(), branch, path));
        }
    }

    Ok(())
}

/// `git grep -l <rev>` reports entries as `<rev>:<path>`; recover the
/// in-repo path. Entries without the prefix pass through unchanged.
fn strip_revision_prefix<'a>(entry: &'a str, branch: &str) -> &'a str {
    entry
        .strip_prefix(branch)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(entry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
