//! Branch-scanning tests against real repositories built with the git CLI.
//!
//! Each test skips itself when no usable `git` binary is on PATH.

use std::path::Path;
use std::process::Command;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args([
            "-c",
            "user.name=kindex-test",
            "-c",
            "user.email=kindex@test.invalid",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed in {}", repo.display());
}

/// Build a repository with two branches:
///
/// - `main`: `deploy.yaml` (Deployment, apps/v1)
/// - `feature/foo`: adds `foo.yaml` (another Deployment)
///
/// `main` is checked out afterwards, so the working tree holds only
/// `deploy.yaml`.
fn setup_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    git(root, &["init", "-q"]);
    std::fs::write(
        root.join("deploy.yaml"),
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
    )
    .unwrap();
    git(root, &["add", "deploy.yaml"]);
    git(root, &["commit", "-q", "-m", "add deployment"]);
    git(root, &["branch", "-M", "main"]);

    git(root, &["checkout", "-q", "-b", "feature/foo"]);
    std::fs::write(
        root.join("foo.yaml"),
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: foo\n",
    )
    .unwrap();
    git(root, &["add", "foo.yaml"]);
    git(root, &["commit", "-q", "-m", "add foo deployment"]);
    git(root, &["checkout", "-q", "main"]);

    dir
}

/// Run a buffered plain-text scan over `root` and return the records.
fn scan_lines(root: &Path, builder: kindex::ScanBuilder) -> Vec<String> {
    let mut out = Vec::new();
    builder.root(root).stream(false).run(&mut out).unwrap();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn branch_keyword_filter_limits_scanned_branches() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = setup_repo();
    let records = scan_lines(
        dir.path(),
        kindex::scan().kind("Deployment").branch_keywords(["foo"]),
    );

    // feature/foo carries both manifests; main matches too but was filtered.
    assert!(
        records.iter().any(|r| r.contains(":feature/foo:")),
        "feature/foo must be scanned: {records:?}"
    );
    assert!(
        !records.iter().any(|r| r.contains(":main:")),
        "main must be skipped by the keyword filter: {records:?}"
    );
}

#[test]
fn empty_keyword_list_scans_every_branch() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = setup_repo();
    let records = scan_lines(dir.path(), kindex::scan().kind("Deployment"));

    assert!(records.iter().any(|r| r.contains(":main:")));
    assert!(records.iter().any(|r| r.contains(":feature/foo:")));
}

#[test]
fn branch_records_use_repo_branch_path_format() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = setup_repo();
    let records = scan_lines(
        dir.path(),
        kindex::scan().kind("Deployment").branch_keywords(["foo"]),
    );

    let expected = format!("{}:feature/foo:foo.yaml", dir.path().display());
    assert!(
        records.contains(&expected),
        "want {expected} in {records:?}"
    );
}

#[test]
fn working_tree_file_is_also_reported_as_plain_match() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = setup_repo();
    let records = scan_lines(dir.path(), kindex::scan().kind("Deployment"));

    let plain = format!("{}", dir.path().join("deploy.yaml").display());
    assert!(
        records.contains(&plain),
        "checked-out manifest must also surface as a plain file: {records:?}"
    );
}

#[test]
fn disabling_git_reports_only_disk_files() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = setup_repo();
    let records = scan_lines(dir.path(), kindex::scan().kind("Deployment").git(false));

    assert_eq!(records.len(), 1, "only the checked-out file: {records:?}");
    assert!(records[0].ends_with("deploy.yaml"));
    assert!(!records[0].contains(":main:"));
}

#[test]
fn grep_no_hits_is_not_an_error() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = setup_repo();
    let records = scan_lines(dir.path(), kindex::scan().kind("StatefulSet"));
    assert!(records.is_empty());
}

#[test]
fn fatal_git_failure_cancels_scan_and_suppresses_buffered_output() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    // A bare `.git` directory that is not a repository: branch listing fails.
    std::fs::create_dir(root.join(".git")).unwrap();
    std::fs::write(
        root.join("deploy.yaml"),
        "apiVersion: apps/v1\nkind: Deployment\n",
    )
    .unwrap();

    let mut out = Vec::new();
    let err = kindex::scan()
        .root(root)
        .kind("Deployment")
        .stream(false)
        .run(&mut out)
        .unwrap_err();

    assert!(
        matches!(err, kindex::ScanError::Git { .. }),
        "branch listing failure must surface as the scan's result: {err}"
    );
    assert!(
        out.is_empty(),
        "a cancelled buffered scan must emit nothing, even for records \
         collected before the failure"
    );
}

#[test]
fn git_metadata_is_walked_only_when_scanning_is_disabled() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = setup_repo();
    std::fs::write(
        dir.path().join(".git").join("stash.yaml"),
        "apiVersion: apps/v1\nkind: Deployment\n",
    )
    .unwrap();

    let with_git = scan_lines(dir.path(), kindex::scan().kind("Deployment"));
    assert!(
        !with_git.iter().any(|r| r.ends_with("stash.yaml")),
        "metadata subtree must be skipped when repositories are scanned: {with_git:?}"
    );

    let without_git = scan_lines(dir.path(), kindex::scan().kind("Deployment").git(false));
    assert!(
        without_git.iter().any(|r| r.ends_with("stash.yaml")),
        ".git gets no special treatment once git scanning is off: {without_git:?}"
    );
}

#[test]
fn single_worker_scans_repositories_without_deadlock() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let dir = setup_repo();
    let records = scan_lines(dir.path(), kindex::scan().kind("Deployment").workers(1));

    assert!(records.iter().any(|r| r.contains(":feature/foo:foo.yaml")));
}
