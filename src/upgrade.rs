/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::upgrade
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Compute outdated installed packages across the sync
    repositories and the AUR, batching foreign lookups.

  Security / Safety Notes:
    Read-only; network access goes through the configured
    foreign metadata source.

  Dependencies:
    tokio JoinSet and Semaphore for batch fan-out, crate::aur
    metadata contract, crate::version comparisons.

  Operational Scope:
    Produces the candidate list consumed by the build step and
    the JSON manifest writer.

  Revision History:
    2024-11-04 COD  Built version comparison for manifest output.
    2026-10-16 COD  Reworked into concurrent upgrade scanner.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Fail-soft batches with every failure reported
    - Blocking fan-in; no polling loops
    - Sorted, deterministic output
============================================================*/

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::aur::ForeignMetadata;
use crate::config::UpgradeConfig;
use crate::error::{MultiError, Result, SynsyuError};
use crate::inventory::{LocalInventory, SyncRepository};
use crate::logger::Logger;
use crate::package_info::{CandidateSource, ForeignRecord, InventoryEntry, UpgradeCandidate};
use crate::session::Session;
use crate::version::compare_evr;

/// Result of an upgrade scan.
#[derive(Debug, Default)]
pub struct UpgradeList {
    pub from_repo: Vec<UpgradeCandidate>,
    pub foreign: Vec<UpgradeCandidate>,
    /// Foreign batches that could not be looked up.
    pub failures: MultiError,
}

impl UpgradeList {
    pub fn is_empty(&self) -> bool {
        self.from_repo.is_empty() && self.foreign.is_empty()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &UpgradeCandidate> {
        self.from_repo.iter().chain(self.foreign.iter())
    }
}

pub struct UpgradeScanner {
    local: Arc<dyn LocalInventory>,
    repos: Vec<Arc<dyn SyncRepository>>,
    source: Arc<dyn ForeignMetadata>,
    logger: Arc<Logger>,
    batch_size: usize,
    max_parallel: usize,
    policy: UpgradeConfig,
}

type BatchOutcome = (usize, Vec<InventoryEntry>, Result<Vec<ForeignRecord>>);

impl UpgradeScanner {
    pub fn new(session: &Session, source: Arc<dyn ForeignMetadata>) -> Self {
        Self {
            local: Arc::clone(&session.local),
            repos: session.repos.clone(),
            source,
            logger: Arc::clone(&session.logger),
            batch_size: session.config.aur.max_args.max(1),
            max_parallel: session.config.aur.max_parallel_requests,
            policy: session.config.upgrade.clone(),
        }
    }

    /// Scan every installed package for a newer version.
    ///
    /// Inventory errors abort the scan. Foreign batch failures do not; they
    /// are collected in [`UpgradeList::failures`].
    pub async fn list(&self) -> Result<UpgradeList> {
        let ignored: HashSet<&str> = self.policy.ignore.iter().map(String::as_str).collect();
        let mut result = UpgradeList::default();
        let mut foreign = Vec::new();

        for entry in self.local.enumerate_all()? {
            if ignored.contains(entry.name.as_str()) {
                self.logger
                    .debug("UPGRADE", format!("{} ignored by policy", entry.name));
                continue;
            }
            match self.tracking_repo(&entry.name)? {
                Some((repo, remote)) => {
                    if compare_evr(&remote.version, &entry.version) == Ordering::Greater {
                        result.from_repo.push(UpgradeCandidate {
                            name: entry.name,
                            source: CandidateSource::Repo(repo),
                            local_version: entry.version,
                            remote_version: remote.version,
                        });
                    }
                }
                None => foreign.push(entry),
            }
        }

        self.logger.info(
            "UPGRADE",
            format!(
                "{} repo upgrade(s); {} foreign package(s) to query",
                result.from_repo.len(),
                foreign.len()
            ),
        );

        let (candidates, failures) = self.scan_foreign(foreign).await;
        result.foreign = candidates;
        result.failures = failures;

        result.from_repo.sort_by(|a, b| a.name.cmp(&b.name));
        result.foreign.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    // First repository carrying the name wins.
    fn tracking_repo(&self, name: &str) -> Result<Option<(String, InventoryEntry)>> {
        for repo in &self.repos {
            if let Some(remote) = repo.lookup_by_name(name)? {
                return Ok(Some((repo.name().to_string(), remote)));
            }
        }
        Ok(None)
    }

    async fn scan_foreign(
        &self,
        packages: Vec<InventoryEntry>,
    ) -> (Vec<UpgradeCandidate>, MultiError) {
        let mut candidates = Vec::new();
        let mut failures = MultiError::new();
        if packages.is_empty() {
            return (candidates, failures);
        }

        let semaphore =
            (self.max_parallel > 0).then(|| Arc::new(Semaphore::new(self.max_parallel)));
        let mut tasks: JoinSet<BatchOutcome> = JoinSet::new();
        for (index, batch) in packages.chunks(self.batch_size).enumerate() {
            let batch = batch.to_vec();
            let source = Arc::clone(&self.source);
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let names: Vec<String> = batch.iter().map(|entry| entry.name.clone()).collect();
                let outcome: Result<Vec<ForeignRecord>> = async move {
                    let _permit = match semaphore {
                        Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(|_| {
                            SynsyuError::Runtime("AUR semaphore closed".into())
                        })?),
                        None => None,
                    };
                    source.info(&names).await
                }
                .await;
                (index, batch, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, batch, Ok(records))) => {
                    let (pairs, unmatched) = match_positionally(&batch, records);
                    for name in unmatched {
                        self.logger.warn(
                            "AURBATCH",
                            format!(
                                "batch {}: record {name} out of request order; dropped",
                                index + 1
                            ),
                        );
                    }
                    candidates.extend(
                        pairs
                            .into_iter()
                            .filter(|(local, record)| self.is_foreign_upgrade(local, record))
                            .map(|(local, record)| UpgradeCandidate {
                                name: local.name.clone(),
                                source: CandidateSource::Aur,
                                local_version: local.version.clone(),
                                remote_version: record.version,
                            }),
                    );
                }
                Ok((index, batch, Err(err))) => {
                    let label = batch_label(index, &batch);
                    self.logger.warn("AURBATCH", format!("{label} failed: {err}"));
                    failures.push(label, err);
                }
                Err(err) => {
                    self.logger
                        .error("AURBATCH", format!("foreign batch task aborted: {err}"));
                    failures.push(
                        "foreign batch task",
                        SynsyuError::Runtime(format!("task aborted: {err}")),
                    );
                }
            }
        }

        (candidates, failures)
    }

    fn is_foreign_upgrade(&self, local: &InventoryEntry, record: &ForeignRecord) -> bool {
        match compare_evr(&record.version, &local.version) {
            Ordering::Greater => true,
            _ => self.policy.prefer_build_time && record.last_modified > local.build_date,
        }
    }
}

/// Pair records with the requested entries, assuming the service answers in
/// request order and omits unknown names.
///
/// Requested entries with no record are skipped. A record whose name does
/// not appear later in the request is returned in the unmatched list.
fn match_positionally(
    batch: &[InventoryEntry],
    records: Vec<ForeignRecord>,
) -> (Vec<(&InventoryEntry, ForeignRecord)>, Vec<String>) {
    let mut pairs = Vec::with_capacity(records.len());
    let mut unmatched = Vec::new();
    let mut cursor = 0;
    for record in records {
        match batch[cursor..]
            .iter()
            .position(|entry| entry.name == record.name)
        {
            Some(offset) => {
                cursor += offset;
                pairs.push((&batch[cursor], record));
                cursor += 1;
            }
            None => unmatched.push(record.name),
        }
    }
    (pairs, unmatched)
}

fn batch_label(index: usize, batch: &[InventoryEntry]) -> String {
    let names: Vec<&str> = batch.iter().map(|entry| entry.name.as_str()).collect();
    format!("batch {} [{}]", index + 1, names.join(", "))
}
