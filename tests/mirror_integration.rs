//! Integration tests for the mirror synchroniser.
//!
//! Each test builds a real upstream git repository in a temporary
//! directory and points the mirror's base URL at it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use synsyu_aur::config::MirrorConfig;
use synsyu_aur::logger::Logger;
use synsyu_aur::mirror::{MirrorSync, SEEN_REF};

const PKGBUILD: &str = "pkgname=pkg\npkgver=1.0\npkgrel=1\narch=(any)\n";
const SRCINFO: &str = "pkgbase = pkg\n\tpkgver = 1.0\n\tpkgrel = 1\n\tarch = any\n\npkgname = pkg\n";

/// Upstream repository plus an empty clone directory.
struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let upstream = root.path().join("remote").join("pkg.git");
        std::fs::create_dir_all(&upstream).unwrap();

        run_git(&upstream, &["init", "--quiet"]);
        run_git(&upstream, &["config", "user.email", "test@example.com"]);
        run_git(&upstream, &["config", "user.name", "Test User"]);
        std::fs::write(upstream.join("PKGBUILD"), PKGBUILD).unwrap();
        std::fs::write(upstream.join(".SRCINFO"), SRCINFO).unwrap();
        run_git(&upstream, &["add", "PKGBUILD", ".SRCINFO"]);
        run_git(&upstream, &["commit", "--quiet", "-m", "Initial import"]);

        Self { root }
    }

    fn upstream(&self) -> PathBuf {
        self.root.path().join("remote").join("pkg.git")
    }

    fn clone_dir(&self) -> PathBuf {
        self.root.path().join("clones")
    }

    fn mirror(&self) -> PathBuf {
        self.clone_dir().join("pkg")
    }

    fn sync(&self) -> MirrorSync {
        self.sync_at(self.clone_dir())
    }

    fn sync_at(&self, clone_dir: PathBuf) -> MirrorSync {
        let mut env = BTreeMap::new();
        env.insert("GIT_TERMINAL_PROMPT".to_string(), "0".to_string());
        for key in ["GIT_AUTHOR_NAME", "GIT_COMMITTER_NAME"] {
            env.insert(key.to_string(), "Test User".to_string());
        }
        for key in ["GIT_AUTHOR_EMAIL", "GIT_COMMITTER_EMAIL"] {
            env.insert(key.to_string(), "test@example.com".to_string());
        }
        let config = MirrorConfig {
            aur_url: self.root.path().join("remote").display().to_string(),
            git_env: env,
            git_timeout: 60,
            ..MirrorConfig::default()
        };
        MirrorSync::new(&config, clone_dir, Arc::new(Logger::capturing()))
    }

    /// Commit a new upstream release touching PKGBUILD and .SRCINFO.
    fn bump_upstream(&self, pkgrel: u32) {
        let upstream = self.upstream();
        std::fs::write(
            upstream.join("PKGBUILD"),
            PKGBUILD.replace("pkgrel=1", &format!("pkgrel={pkgrel}")),
        )
        .unwrap();
        std::fs::write(
            upstream.join(".SRCINFO"),
            SRCINFO.replace("pkgrel = 1", &format!("pkgrel = {pkgrel}")),
        )
        .unwrap();
        run_git(&upstream, &["commit", "--quiet", "-am", &format!("Bump pkgrel to {pkgrel}")]);
    }
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Run a git command in the given directory.
fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Run a git command and return trimmed stdout.
fn git_out(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[tokio::test]
async fn test_download_clones_then_fetches() {
    let fixture = Fixture::new();
    let sync = fixture.sync();

    let (fetched, failures) = sync.download(&names(&["pkg"])).await;
    assert!(failures.is_empty(), "{failures}");
    assert!(fetched.is_empty());
    assert!(fixture.mirror().join("PKGBUILD").exists());

    let (fetched, failures) = sync.download(&names(&["pkg"])).await;
    assert!(failures.is_empty(), "{failures}");
    assert_eq!(fetched, vec!["pkg"]);
}

#[tokio::test]
async fn test_download_failure_does_not_stop_other_names() {
    let fixture = Fixture::new();
    let sync = fixture.sync();

    let (_, failures) = sync.download(&names(&["missing", "pkg"])).await;
    assert_eq!(failures.items(), vec!["missing"]);
    assert!(fixture.mirror().join(".git").exists());
}

#[tokio::test]
async fn test_mark_seen_clears_needs_merge_until_upstream_moves() {
    let fixture = Fixture::new();
    let sync = fixture.sync();
    let pkg = names(&["pkg"]);
    sync.download(&pkg).await.1.into_result().unwrap();

    sync.mark_seen(&pkg).await.unwrap();
    assert!(sync.needs_merge(&pkg).await.unwrap().is_empty());
    assert!(sync.state("pkg").await.unwrap().has_seen_marker);

    fixture.bump_upstream(2);
    sync.download(&pkg).await.1.into_result().unwrap();
    assert_eq!(sync.needs_merge(&pkg).await.unwrap(), vec!["pkg"]);
}

#[tokio::test]
async fn test_fresh_clone_without_marker_needs_no_merge() {
    let fixture = Fixture::new();
    let sync = fixture.sync();
    let pkg = names(&["pkg"]);
    sync.download(&pkg).await.1.into_result().unwrap();

    assert!(!sync.state("pkg").await.unwrap().has_seen_marker);
    assert!(sync.needs_merge(&pkg).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_merge_brings_mirror_to_upstream() {
    let fixture = Fixture::new();
    let sync = fixture.sync();
    let pkg = names(&["pkg"]);
    sync.download(&pkg).await.1.into_result().unwrap();
    sync.mark_seen(&pkg).await.unwrap();

    fixture.bump_upstream(2);
    sync.download(&pkg).await.1.into_result().unwrap();
    sync.merge(&pkg).await.unwrap();

    assert_eq!(
        git_out(&fixture.mirror(), &["rev-parse", "HEAD"]),
        git_out(&fixture.upstream(), &["rev-parse", "HEAD"])
    );
    // Merging does not count as reviewing.
    assert_eq!(sync.needs_merge(&pkg).await.unwrap(), vec!["pkg"]);
    sync.mark_seen(&pkg).await.unwrap();
    assert!(sync.needs_merge(&pkg).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_merge_stops_at_first_failure() {
    let fixture = Fixture::new();
    let sync = fixture.sync();
    sync.download(&names(&["pkg"])).await.1.into_result().unwrap();
    let before = git_out(&fixture.mirror(), &["rev-parse", "HEAD"]);

    fixture.bump_upstream(2);
    sync.download(&names(&["pkg"])).await.1.into_result().unwrap();

    let err = sync.merge(&names(&["missing", "pkg"])).await.unwrap_err();
    assert!(err.to_string().contains("missing"));
    assert_eq!(git_out(&fixture.mirror(), &["rev-parse", "HEAD"]), before);
}

#[tokio::test]
async fn test_diff_reports_unreviewed_changes_without_touching_mirror() {
    let fixture = Fixture::new();
    let sync = fixture.sync();
    let pkg = names(&["pkg"]);
    sync.download(&pkg).await.1.into_result().unwrap();
    sync.mark_seen(&pkg).await.unwrap();

    assert!(sync.diff(&pkg).await.unwrap().is_empty());

    fixture.bump_upstream(2);
    sync.download(&pkg).await.1.into_result().unwrap();
    let head_before = git_out(&fixture.mirror(), &["rev-parse", "HEAD"]);

    let diffs = sync.diff(&pkg).await.unwrap();
    let text = &diffs["pkg"];
    assert!(text.contains("Bump pkgrel to 2"));
    assert!(text.contains("+pkgrel=2"));
    assert!(!text.contains("a/.SRCINFO"));

    let mirror = fixture.mirror();
    assert_eq!(git_out(&mirror, &["rev-parse", "HEAD"]), head_before);
    assert!(git_out(&mirror, &["status", "--porcelain"]).is_empty());
    assert_eq!(git_out(&mirror, &["worktree", "list"]).lines().count(), 1);
    assert!(!git_out(&mirror, &["rev-parse", SEEN_REF]).is_empty());
}

#[tokio::test]
async fn test_diff_without_marker_covers_whole_tree() {
    let fixture = Fixture::new();
    let sync = fixture.sync();
    let pkg = names(&["pkg"]);
    sync.download(&pkg).await.1.into_result().unwrap();

    let diffs = sync.diff(&pkg).await.unwrap();
    let text = &diffs["pkg"];
    assert!(text.contains("Initial import"));
    assert!(text.contains("+pkgname=pkg"));
}

#[tokio::test]
async fn test_review_view_links_new_mirrors_and_diff_files() {
    let fixture = Fixture::new();
    let sync = fixture.sync();
    let pkg = names(&["pkg"]);
    sync.download(&pkg).await.1.into_result().unwrap();

    let written = sync.diffs_to_file(&pkg).await.unwrap();
    assert_eq!(written, vec![fixture.clone_dir().join("pkg.diff")]);

    let view = sync.make_review_view(&pkg, &pkg).await.unwrap();
    assert!(view.join("new").join("pkg").join("PKGBUILD").exists());
    assert!(view.join("all").join("pkg").join("PKGBUILD").exists());
    let linked = std::fs::read_to_string(view.join("diffs").join("pkg.diff")).unwrap();
    assert!(linked.contains("PKGBUILD"));

    sync.mark_seen(&pkg).await.unwrap();
    let second = sync.make_review_view(&pkg, &[]).await.unwrap();
    assert!(!second.join("new").join("pkg").exists());
    assert!(second.join("all").join("pkg").exists());

    std::fs::remove_dir_all(view).unwrap();
    std::fs::remove_dir_all(second).unwrap();
}

#[tokio::test]
async fn test_relative_clone_dir_keeps_mirrors_in_place() {
    let fixture = Fixture::new();
    let cwd = std::env::current_dir().unwrap();
    let scratch = tempfile::Builder::new()
        .prefix("synsyu-relative-")
        .tempdir_in(&cwd)
        .unwrap();
    let relative = scratch
        .path()
        .strip_prefix(&cwd)
        .unwrap_or(scratch.path())
        .join("clones");
    assert!(relative.is_relative());

    let sync = fixture.sync_at(relative.clone());
    let pkg = names(&["pkg"]);
    sync.download(&pkg).await.1.into_result().unwrap();
    assert!(scratch.path().join("clones").join("pkg").join(".git").exists());
    assert!(!scratch.path().join("clones").join(&relative).exists());

    let (fetched, failures) = sync.download(&pkg).await;
    assert!(failures.is_empty(), "{failures}");
    assert_eq!(fetched, vec!["pkg"]);

    sync.mark_seen(&pkg).await.unwrap();
    assert!(sync.needs_merge(&pkg).await.unwrap().is_empty());

    let view = sync.make_review_view(&pkg, &[]).await.unwrap();
    assert!(view.join("all").join("pkg").join("PKGBUILD").exists());
    std::fs::remove_dir_all(view).unwrap();
}

#[tokio::test]
async fn test_print_diffs_succeeds_without_terminal() {
    let fixture = Fixture::new();
    let sync = fixture.sync();
    let pkg = names(&["pkg"]);
    sync.download(&pkg).await.1.into_result().unwrap();

    sync.print_diffs(&pkg).await.unwrap();
    assert!(git_out(&fixture.mirror(), &["status", "--porcelain"]).is_empty());
}
