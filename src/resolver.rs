/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::resolver
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Classify requested targets as already satisfied locally,
    available from a sync repository, or left for AUR lookup.

  Security / Safety Notes:
    Read-only against inventory snapshots.

  Dependencies:
    crate::inventory contracts, crate::constraint parsing.

  Operational Scope:
    First stage of an install request; its unresolved output
    feeds the foreign metadata lookup.

  Revision History:
    2026-10-16 COD  Authored target classification.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Stable partitions for a given snapshot
    - Inventory failures abort the whole call
============================================================*/

use std::collections::HashSet;
use std::sync::Arc;

use crate::constraint::bare_name;
use crate::error::{Result, SynsyuError};
use crate::inventory::{LocalInventory, SyncRepository};
use crate::logger::Logger;
use crate::session::Session;

/// A target served by a sync repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub requested: String,
    pub repo: String,
    pub provider: String,
}

/// A target naming a sync repository group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTarget {
    pub group: String,
    pub repo: String,
    pub members: Vec<String>,
}

/// Partition of requested targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub satisfied: Vec<String>,
    pub from_repo: Vec<RepoTarget>,
    pub groups: Vec<GroupTarget>,
    /// Bare names left for foreign lookup.
    pub unresolved: Vec<String>,
}

pub struct Resolver<'a> {
    local: &'a dyn LocalInventory,
    repos: &'a [Arc<dyn SyncRepository>],
    logger: &'a Logger,
}

impl<'a> Resolver<'a> {
    pub fn new(
        local: &'a dyn LocalInventory,
        repos: &'a [Arc<dyn SyncRepository>],
        logger: &'a Logger,
    ) -> Self {
        Self {
            local,
            repos,
            logger,
        }
    }

    pub fn from_session(session: &'a Session) -> Self {
        Self::new(session.local.as_ref(), &session.repos, &session.logger)
    }

    /// Classify `names`, skipping anything listed in `baseline`.
    ///
    /// A target may be qualified as `repo/name` to restrict the sync lookup.
    pub fn classify(&self, names: &[String], baseline: Option<&[String]>) -> Result<Classification> {
        let skip: HashSet<&str> = baseline
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect();
        let mut result = Classification::default();

        for target in names {
            let target = target.trim();
            if target.is_empty() || skip.contains(target) {
                continue;
            }
            let (repo_filter, dependency) = split_repo(target);
            let bare = bare_name(dependency);
            if skip.contains(bare) {
                continue;
            }

            if repo_filter.is_none() {
                let local = self
                    .local
                    .find_satisfier(dependency)
                    .map_err(|err| inventory_failure(target, err))?;
                if let Some(entry) = local {
                    self.logger.debug(
                        "RESOLVE",
                        format!("{target} satisfied by installed {}", entry.name),
                    );
                    result.satisfied.push(target.to_string());
                    continue;
                }
            }

            if let Some(found) = self.find_in_repos(repo_filter, dependency, target)? {
                self.logger.debug(
                    "RESOLVE",
                    format!("{target} provided by {}/{}", found.repo, found.provider),
                );
                result.from_repo.push(found);
                continue;
            }

            if let Some(group) = self.find_group(repo_filter, bare, target)? {
                result.groups.push(group);
                continue;
            }

            self.logger
                .debug("RESOLVE", format!("{target} left for AUR lookup"));
            result.unresolved.push(bare.to_string());
        }

        self.logger.info(
            "RESOLVE",
            format!(
                "satisfied={} repo={} groups={} unresolved={}",
                result.satisfied.len(),
                result.from_repo.len(),
                result.groups.len(),
                result.unresolved.len()
            ),
        );
        Ok(result)
    }

    fn repos_matching<'r>(
        &'r self,
        repo_filter: Option<&'r str>,
    ) -> impl Iterator<Item = &'r Arc<dyn SyncRepository>> + 'r {
        self.repos
            .iter()
            .filter(move |repo| repo_filter.map_or(true, |wanted| repo.name() == wanted))
    }

    fn find_in_repos(
        &self,
        repo_filter: Option<&str>,
        dependency: &str,
        target: &str,
    ) -> Result<Option<RepoTarget>> {
        for repo in self.repos_matching(repo_filter) {
            let hit = repo
                .find_satisfier(dependency)
                .map_err(|err| inventory_failure(target, err))?;
            if let Some(entry) = hit {
                return Ok(Some(RepoTarget {
                    requested: target.to_string(),
                    repo: repo.name().to_string(),
                    provider: entry.name,
                }));
            }
        }
        Ok(None)
    }

    fn find_group(
        &self,
        repo_filter: Option<&str>,
        group: &str,
        target: &str,
    ) -> Result<Option<GroupTarget>> {
        for repo in self.repos_matching(repo_filter) {
            let members = repo
                .group_members(group)
                .map_err(|err| inventory_failure(target, err))?;
            if !members.is_empty() {
                return Ok(Some(GroupTarget {
                    group: group.to_string(),
                    repo: repo.name().to_string(),
                    members: members.into_iter().map(|entry| entry.name).collect(),
                }));
            }
        }
        Ok(None)
    }
}

fn split_repo(target: &str) -> (Option<&str>, &str) {
    match target.split_once('/') {
        Some((repo, rest)) if !repo.is_empty() && !rest.is_empty() => (Some(repo), rest),
        _ => (None, target),
    }
}

// Malformed targets keep their parse error; everything else is an
// inventory failure tied to the target being resolved.
fn inventory_failure(target: &str, err: SynsyuError) -> SynsyuError {
    match err {
        err @ (SynsyuError::Format { .. } | SynsyuError::Inventory(_)) => err,
        other => SynsyuError::Inventory(format!("lookup of `{target}` failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::PackageDb;
    use crate::package_info::{InventoryEntry, Origin};

    fn fixtures() -> (PackageDb, Vec<Arc<dyn SyncRepository>>) {
        let local = PackageDb::new(
            "local",
            vec![InventoryEntry::new("foo", "1.0-1", Origin::Local)],
        );
        let core = PackageDb::new(
            "core",
            vec![InventoryEntry::new("foo", "1.2-1", Origin::SyncRepo("core".into()))],
        );
        let extra = PackageDb::new(
            "extra",
            vec![
                InventoryEntry::new("foo", "1.3-1", Origin::SyncRepo("extra".into())),
                InventoryEntry::new("rust", "1:1.81.0-1", Origin::SyncRepo("extra".into()))
                    .with_provides(["cargo"]),
                InventoryEntry::new("xorg-server", "21.1.13-1", Origin::SyncRepo("extra".into()))
                    .with_groups(["xorg"]),
                InventoryEntry::new("xorg-xinit", "1.4.2-1", Origin::SyncRepo("extra".into()))
                    .with_groups(["xorg"]),
            ],
        );
        let repos: Vec<Arc<dyn SyncRepository>> = vec![Arc::new(core), Arc::new(extra)];
        (local, repos)
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_constraint_selects_repository_or_unresolved() {
        let (local, repos) = fixtures();
        let logger = Logger::capturing();
        let resolver = Resolver::new(&local, &repos, &logger);

        let result = resolver.classify(&names(&["foo>=1.1"]), None).unwrap();
        assert!(result.satisfied.is_empty());
        assert_eq!(
            result.from_repo,
            vec![RepoTarget {
                requested: "foo>=1.1".into(),
                repo: "core".into(),
                provider: "foo".into(),
            }]
        );

        let result = resolver.classify(&names(&["foo>=2.0"]), None).unwrap();
        assert!(result.from_repo.is_empty());
        assert_eq!(result.unresolved, vec!["foo"]);
    }

    #[test]
    fn test_installed_satisfier_wins() {
        let (local, repos) = fixtures();
        let logger = Logger::capturing();
        let resolver = Resolver::new(&local, &repos, &logger);
        let result = resolver.classify(&names(&["foo", "foo<1.1"]), None).unwrap();
        assert_eq!(result.satisfied, vec!["foo", "foo<1.1"]);
    }

    #[test]
    fn test_provider_name_is_recorded() {
        let (local, repos) = fixtures();
        let logger = Logger::capturing();
        let resolver = Resolver::new(&local, &repos, &logger);
        let result = resolver.classify(&names(&["cargo"]), None).unwrap();
        assert_eq!(result.from_repo[0].provider, "rust");
        assert_eq!(result.from_repo[0].repo, "extra");
    }

    #[test]
    fn test_repo_qualified_target_and_groups() {
        let (local, repos) = fixtures();
        let logger = Logger::capturing();
        let resolver = Resolver::new(&local, &repos, &logger);
        let result = resolver
            .classify(&names(&["extra/foo", "xorg", "yay"]), None)
            .unwrap();
        assert_eq!(result.from_repo[0].repo, "extra");
        assert_eq!(result.groups[0].members, vec!["xorg-server", "xorg-xinit"]);
        assert_eq!(result.unresolved, vec!["yay"]);
    }

    #[test]
    fn test_baseline_entries_are_skipped_and_results_stable() {
        let (local, repos) = fixtures();
        let logger = Logger::capturing();
        let resolver = Resolver::new(&local, &repos, &logger);
        let targets = names(&["foo>=1.1", "yay", "paru-bin>=2"]);
        let baseline = names(&["yay"]);

        let first = resolver.classify(&targets, Some(baseline.as_slice())).unwrap();
        let second = resolver.classify(&targets, Some(baseline.as_slice())).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.unresolved, vec!["paru-bin"]);
    }

    struct BrokenInventory;

    impl LocalInventory for BrokenInventory {
        fn lookup_by_name(&self, _: &str) -> Result<Option<InventoryEntry>> {
            Err(SynsyuError::Runtime("database locked".into()))
        }
        fn enumerate_all(&self) -> Result<Vec<InventoryEntry>> {
            Err(SynsyuError::Runtime("database locked".into()))
        }
        fn find_satisfier(&self, _: &str) -> Result<Option<InventoryEntry>> {
            Err(SynsyuError::Runtime("database locked".into()))
        }
        fn reverse_dependents(&self, _: &str) -> Result<Vec<String>> {
            Err(SynsyuError::Runtime("database locked".into()))
        }
    }

    #[test]
    fn test_inventory_failure_aborts_classification() {
        let (_, repos) = fixtures();
        let logger = Logger::capturing();
        let resolver = Resolver::new(&BrokenInventory, &repos, &logger);
        let err = resolver
            .classify(&names(&["foo", "bar"]), None)
            .unwrap_err();
        match err {
            SynsyuError::Inventory(message) => assert!(message.contains("`foo`")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
