/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::mirror
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Maintain local git mirrors of AUR package sources: clone,
    fetch, review diffs, merge upstream and record which state
    has been reviewed through the AUR_SEEN marker ref.

  Security / Safety Notes:
    Diffs are computed in a disposable worktree so the mirror's
    own working tree is never left mid-merge. Concurrent calls
    against the same pkgbase must be serialised by the caller.

  Dependencies:
    crate::git runner, tokio JoinSet for concurrent downloads,
    tempfile for worktrees and review views.

  Operational Scope:
    Feeds the external build step with reviewed sources.

  Revision History:
    2026-10-16 COD  Authored mirror synchroniser.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Downloads are fail-soft; merges are fail-fast
    - Every failure names its pkgbase
============================================================*/

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::config::MirrorConfig;
use crate::error::{MultiError, Result, SynsyuError};
use crate::git::GitRunner;
use crate::logger::Logger;
use crate::session::Session;

/// Ref recording the last reviewed state of a mirror.
pub const SEEN_REF: &str = "AUR_SEEN";

// Well-known hash of the empty tree; baseline for never-reviewed mirrors.
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

const UPSTREAM: &str = "HEAD@{upstream}";

/// On-disk state of one mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorState {
    pub pkgbase: String,
    pub local_path: PathBuf,
    pub has_seen_marker: bool,
}

/// Local git mirrors rooted at one clone directory.
pub struct MirrorSync {
    git: GitRunner,
    aur_url: String,
    clone_dir: PathBuf,
    logger: Arc<Logger>,
}

impl MirrorSync {
    /// A relative `clone_dir` is anchored to the current directory so that
    /// mirror paths and review links stay valid wherever git runs.
    pub fn new(config: &MirrorConfig, clone_dir: PathBuf, logger: Arc<Logger>) -> Self {
        let clone_dir = std::path::absolute(&clone_dir).unwrap_or(clone_dir);
        Self {
            git: GitRunner::new(config),
            aur_url: config.aur_url.trim_end_matches('/').to_string(),
            clone_dir,
            logger,
        }
    }

    pub fn from_session(session: &Session) -> Self {
        Self::new(
            &session.config.mirror,
            session.config.clone_dir(),
            Arc::clone(&session.logger),
        )
    }

    pub fn resolve_url(&self, pkgbase: &str) -> String {
        format!("{}/{}.git", self.aur_url, pkgbase)
    }

    pub fn mirror_path(&self, pkgbase: &str) -> PathBuf {
        self.clone_dir.join(pkgbase)
    }

    pub async fn state(&self, pkgbase: &str) -> Result<MirrorState> {
        let local_path = self.mirror_path(pkgbase);
        let has_seen_marker = if local_path.join(".git").exists() {
            self.has_seen(&local_path).await?
        } else {
            false
        };
        Ok(MirrorState {
            pkgbase: pkgbase.to_string(),
            local_path,
            has_seen_marker,
        })
    }

    /// Clone missing mirrors and fetch existing ones, one task per name.
    ///
    /// Returns the names that already had a mirror, sorted, plus every
    /// per-name failure. Failures never stop the other names.
    pub async fn download(&self, names: &[String]) -> (Vec<String>, MultiError) {
        let mut fetched = Vec::new();
        let mut failures = MultiError::new();

        if let Err(err) = std::fs::create_dir_all(&self.clone_dir) {
            let err = SynsyuError::Filesystem(format!(
                "Failed to create clone directory {}: {err}",
                self.clone_dir.display()
            ));
            failures.push(self.clone_dir.display().to_string(), err);
            return (fetched, failures);
        }

        let mut tasks: JoinSet<(String, Result<bool>)> = JoinSet::new();
        for name in names {
            let name = name.clone();
            let git = self.git.clone();
            let url = self.resolve_url(&name);
            let clone_dir = self.clone_dir.clone();
            tasks.spawn(async move {
                let outcome = download_one(&git, &clone_dir, &name, &url).await;
                (name, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(existed))) => {
                    self.logger.info(
                        "MIRROR",
                        format!("{name}: {}", if existed { "fetched" } else { "cloned" }),
                    );
                    if existed {
                        fetched.push(name);
                    }
                }
                Ok((name, Err(err))) => {
                    self.logger.warn("MIRROR", format!("{name}: download failed: {err}"));
                    failures.push(name, err);
                }
                Err(err) => {
                    failures.push(
                        "download task",
                        SynsyuError::Runtime(format!("task aborted: {err}")),
                    );
                }
            }
        }

        fetched.sort();
        (fetched, failures)
    }

    /// Names whose upstream is not yet contained in the reviewed state.
    pub async fn needs_merge(&self, names: &[String]) -> Result<Vec<String>> {
        let mut pending = Vec::new();
        for name in names {
            let path = self.existing_mirror(name)?;
            let reviewed = if self.has_seen(&path).await? {
                SEEN_REF
            } else {
                "HEAD"
            };
            let contained = self
                .git
                .check(
                    Some(&path),
                    ["merge-base", "--is-ancestor", UPSTREAM, reviewed],
                )
                .await?;
            if !contained {
                pending.push(name.clone());
            }
        }
        Ok(pending)
    }

    /// Reset each mirror to its reviewed state and rebase onto upstream.
    ///
    /// Runs sequentially and stops at the first failure.
    pub async fn merge(&self, names: &[String]) -> Result<()> {
        for name in names {
            let path = self.existing_mirror(name)?;
            let reviewed = if self.has_seen(&path).await? {
                SEEN_REF
            } else {
                "HEAD"
            };
            self.git
                .run(Some(&path), ["reset", "--hard", "--quiet", reviewed])
                .await?;
            self.git
                .run(Some(&path), ["rebase", "--quiet", UPSTREAM])
                .await?;
            self.logger.info("MERGE", format!("{name}: merged upstream"));
        }
        Ok(())
    }

    /// Record the current HEAD of each mirror as reviewed.
    pub async fn mark_seen(&self, names: &[String]) -> Result<()> {
        for name in names {
            let path = self.existing_mirror(name)?;
            self.git
                .run(Some(&path), ["update-ref", SEEN_REF, "HEAD"])
                .await?;
            self.logger.debug("MIRROR", format!("{name}: {SEEN_REF} advanced"));
        }
        Ok(())
    }

    /// Combined log and patch of unreviewed upstream changes per name.
    ///
    /// Names without changes are left out of the map.
    pub async fn diff(&self, names: &[String]) -> Result<BTreeMap<String, String>> {
        self.collect_diffs(names, false).await
    }

    /// Print each diff to stdout, colored when stdout is a terminal.
    pub async fn print_diffs(&self, names: &[String]) -> Result<()> {
        let color = std::io::stdout().is_terminal();
        let diffs = self.collect_diffs(names, color).await?;
        let mut stdout = std::io::stdout().lock();
        for (name, text) in &diffs {
            let header = if color {
                format!("\x1b[1m:: {name}\x1b[0m")
            } else {
                format!(":: {name}")
            };
            writeln!(stdout, "{header}\n{text}\n")?;
        }
        Ok(())
    }

    /// Write each diff to `<clone_dir>/<pkgbase>.diff`.
    pub async fn diffs_to_file(&self, names: &[String]) -> Result<Vec<PathBuf>> {
        let diffs = self.collect_diffs(names, false).await?;
        let mut written = Vec::with_capacity(diffs.len());
        for (name, text) in diffs {
            let path = self.diff_file(&name);
            std::fs::write(&path, text).map_err(|err| {
                SynsyuError::Filesystem(format!("Failed to write {}: {err}", path.display()))
            })?;
            written.push(path);
        }
        Ok(written)
    }

    /// Build a temporary directory of symlinks for reviewing a batch.
    ///
    /// `new/` holds mirrors without a seen marker, `all/` every mirror and
    /// `diffs/` the diff files for `diff_names`. The caller deletes the
    /// returned directory.
    pub async fn make_review_view(
        &self,
        names: &[String],
        diff_names: &[String],
    ) -> Result<PathBuf> {
        let root = tempfile::Builder::new()
            .prefix("synsyu-review-")
            .tempdir()
            .map_err(|err| {
                SynsyuError::Filesystem(format!("Failed to create review directory: {err}"))
            })?
            .into_path();

        let new_dir = root.join("new");
        let all_dir = root.join("all");
        let diff_dir = root.join("diffs");
        for dir in [&new_dir, &all_dir, &diff_dir] {
            create_dir(dir)?;
        }

        for name in names {
            let state = self.state(name).await?;
            if !state.local_path.exists() {
                continue;
            }
            symlink(&state.local_path, &all_dir.join(name))?;
            if !state.has_seen_marker {
                symlink(&state.local_path, &new_dir.join(name))?;
            }
        }
        for name in diff_names {
            let file = self.diff_file(name);
            if file.exists() {
                symlink(&file, &diff_dir.join(format!("{name}.diff")))?;
            }
        }

        self.logger
            .info("REVIEW", format!("review view at {}", root.display()));
        Ok(root)
    }

    fn diff_file(&self, pkgbase: &str) -> PathBuf {
        self.clone_dir.join(format!("{pkgbase}.diff"))
    }

    fn existing_mirror(&self, pkgbase: &str) -> Result<PathBuf> {
        let path = self.mirror_path(pkgbase);
        if path.join(".git").exists() {
            Ok(path)
        } else {
            Err(SynsyuError::Filesystem(format!(
                "{pkgbase}: no mirror at {}",
                path.display()
            )))
        }
    }

    async fn has_seen(&self, path: &Path) -> Result<bool> {
        self.git
            .check(Some(path), ["rev-parse", "--quiet", "--verify", SEEN_REF])
            .await
    }

    async fn collect_diffs(
        &self,
        names: &[String],
        color: bool,
    ) -> Result<BTreeMap<String, String>> {
        let mut diffs = BTreeMap::new();
        for name in names {
            let path = self.existing_mirror(name)?;
            let text = self.diff_one(name, &path, color).await?;
            if !text.trim().is_empty() {
                diffs.insert(name.clone(), text);
            }
        }
        Ok(diffs)
    }

    async fn diff_one(&self, name: &str, mirror: &Path, color: bool) -> Result<String> {
        let seen = self.has_seen(mirror).await?;
        let upstream = self
            .git
            .output(Some(mirror), ["rev-parse", "--verify", UPSTREAM])
            .await?;
        let (start, baseline) = if seen {
            let seen_sha = self
                .git
                .output(Some(mirror), ["rev-parse", "--verify", SEEN_REF])
                .await?;
            (seen_sha.clone(), seen_sha)
        } else {
            ("HEAD".to_string(), EMPTY_TREE.to_string())
        };

        let scratch = tempfile::Builder::new()
            .prefix("synsyu-diff-")
            .tempdir()
            .map_err(|err| {
                SynsyuError::Filesystem(format!("Failed to create worktree directory: {err}"))
            })?;
        let worktree = scratch.path().join(name);

        self.git
            .run(
                Some(mirror),
                [
                    OsStr::new("worktree"),
                    OsStr::new("add"),
                    OsStr::new("--detach"),
                    OsStr::new("--quiet"),
                    worktree.as_os_str(),
                    OsStr::new(&start),
                ],
            )
            .await?;

        let outcome = self
            .render_diff(&worktree, seen, &start, &baseline, &upstream, color)
            .await;

        if let Err(err) = self
            .git
            .run(
                Some(mirror),
                [
                    OsStr::new("worktree"),
                    OsStr::new("remove"),
                    OsStr::new("--force"),
                    worktree.as_os_str(),
                ],
            )
            .await
        {
            self.logger
                .warn("DIFF", format!("{name}: worktree cleanup failed: {err}"));
            let _ = self.git.run(Some(mirror), ["worktree", "prune"]).await;
        }

        outcome
    }

    async fn render_diff(
        &self,
        worktree: &Path,
        seen: bool,
        start: &str,
        baseline: &str,
        upstream: &str,
        color: bool,
    ) -> Result<String> {
        let color_flag = if color { "--color=always" } else { "--color=never" };
        self.git
            .run(
                Some(worktree),
                ["merge", "--no-commit", "--no-ff", "--quiet", upstream],
            )
            .await?;

        let range = if seen {
            format!("{start}..{upstream}")
        } else {
            upstream.to_string()
        };
        let log = self
            .git
            .output(Some(worktree), ["log", color_flag, "--no-merges", range.as_str()])
            .await?;
        let patch = self
            .git
            .output(
                Some(worktree),
                [
                    "--no-pager",
                    "diff",
                    color_flag,
                    "--stat",
                    "--patch",
                    "--cached",
                    baseline,
                    "--",
                    ".",
                    ":(exclude).SRCINFO",
                ],
            )
            .await?;

        if patch.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{log}\n\n{patch}\n"))
    }
}

async fn download_one(git: &GitRunner, clone_dir: &Path, name: &str, url: &str) -> Result<bool> {
    let path = clone_dir.join(name);
    if path.join(".git").exists() {
        git.run(Some(&path), ["fetch", "--quiet"]).await?;
        Ok(true)
    } else {
        // No `-C`: the destination is already rooted at the clone directory.
        git.run(
            None,
            [
                OsStr::new("clone"),
                OsStr::new("--quiet"),
                OsStr::new(url),
                path.as_os_str(),
            ],
        )
        .await?;
        Ok(false)
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|err| {
        SynsyuError::Filesystem(format!("Failed to create {}: {err}", path.display()))
    })
}

fn symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(|err| {
        SynsyuError::Filesystem(format!(
            "Failed to link {} -> {}: {err}",
            link.display(),
            target.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_at(dir: &Path) -> MirrorSync {
        let config = MirrorConfig {
            aur_url: "https://aur.archlinux.org/".into(),
            ..MirrorConfig::default()
        };
        MirrorSync::new(&config, dir.to_path_buf(), Arc::new(Logger::capturing()))
    }

    #[test]
    fn test_resolve_url_appends_git_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let sync = sync_at(dir.path());
        assert_eq!(
            sync.resolve_url("yay-bin"),
            "https://aur.archlinux.org/yay-bin.git"
        );
        assert_eq!(sync.mirror_path("yay-bin"), dir.path().join("yay-bin"));
    }

    #[tokio::test]
    async fn test_operations_on_missing_mirror_name_the_pkgbase() {
        let dir = tempfile::tempdir().unwrap();
        let sync = sync_at(dir.path());
        let names = vec!["ghost".to_string()];
        let err = sync.mark_seen(&names).await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
        let state = sync.state("ghost").await.unwrap();
        assert!(!state.has_seen_marker);
    }
}
