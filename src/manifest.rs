/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::manifest
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Render an upgrade scan as a JSON manifest for the Syn-Syu
    orchestrator.

  Security / Safety Notes:
    Manifest data is written to operator-controlled paths; no
    privileged operations are performed.

  Dependencies:
    serde + serde_json for serialization, chrono for stamps.

  Operational Scope:
    Consumed by the Bash orchestrator to decide update flows.

  Revision History:
    2024-11-04 COD  Authored manifest builder.
    2026-10-16 COD  Built from upgrade scan results.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic ordering for reproducible manifests
    - Explicit source attribution for each package
    - Failed lookups recorded, never hidden
============================================================*/

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Result, SynsyuError};
use crate::logger::Logger;
use crate::package_info::CandidateSource;
use crate::upgrade::UpgradeList;

/// Wrapper representing the full manifest document.
#[derive(Debug, Serialize)]
pub struct ManifestDocument {
    pub metadata: ManifestMetadata,
    pub packages: BTreeMap<String, ManifestEntry>,
    pub failures: Vec<ManifestFailure>,
}

/// Metadata block describing manifest context.
#[derive(Debug, Serialize)]
pub struct ManifestMetadata {
    pub generated_at: String,
    pub generated_by: String,
    pub repo_candidates: usize,
    pub aur_candidates: usize,
    pub updates_available: usize,
    pub failed_lookups: usize,
}

/// Per-package manifest entry.
#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    pub installed_version: String,
    pub newer_version: String,
    pub source: PackageSource,
    pub repository: Option<String>,
}

/// Source classification for an update candidate.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PackageSource {
    Pacman,
    Aur,
}

#[derive(Debug, Serialize)]
pub struct ManifestFailure {
    pub item: String,
    pub error: String,
}

/// Build a manifest from a finished upgrade scan.
pub fn build_manifest(list: &UpgradeList, logger: &Logger) -> ManifestDocument {
    let mut packages = BTreeMap::new();
    for candidate in list.candidates() {
        let (source, repository) = match &candidate.source {
            CandidateSource::Repo(repo) => (PackageSource::Pacman, Some(repo.clone())),
            CandidateSource::Aur => (PackageSource::Aur, None),
        };
        logger.debug("MANIFEST", candidate.to_string());
        packages.insert(
            candidate.name.clone(),
            ManifestEntry {
                installed_version: candidate.local_version.clone(),
                newer_version: candidate.remote_version.clone(),
                source,
                repository,
            },
        );
    }

    let failures: Vec<ManifestFailure> = list
        .failures
        .iter()
        .map(|(item, err)| ManifestFailure {
            item: item.to_string(),
            error: err.to_string(),
        })
        .collect();

    ManifestDocument {
        metadata: ManifestMetadata {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            generated_by: "synsyu_aur".to_string(),
            repo_candidates: list.from_repo.len(),
            aur_candidates: list.foreign.len(),
            updates_available: packages.len(),
            failed_lookups: failures.len(),
        },
        packages,
        failures,
    }
}

/// Persist the manifest to the given path.
pub fn write_manifest(document: &ManifestDocument, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            SynsyuError::Filesystem(format!(
                "Failed to create manifest directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    let file = File::create(path).map_err(|err| {
        SynsyuError::Filesystem(format!(
            "Failed to create manifest file {}: {err}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(file, document).map_err(|err| {
        SynsyuError::Serialization(format!(
            "Failed to write manifest {}: {err}",
            path.display()
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_info::UpgradeCandidate;

    fn scan() -> UpgradeList {
        let mut list = UpgradeList::default();
        list.from_repo.push(UpgradeCandidate {
            name: "bash".into(),
            source: CandidateSource::Repo("core".into()),
            local_version: "5.2.032-1".into(),
            remote_version: "5.2.037-1".into(),
        });
        list.foreign.push(UpgradeCandidate {
            name: "yay".into(),
            source: CandidateSource::Aur,
            local_version: "12.3.5-1".into(),
            remote_version: "12.4.2-1".into(),
        });
        list.failures.push(
            "batch 2 [zoom]",
            SynsyuError::Network("connection reset".into()),
        );
        list
    }

    #[test]
    fn test_manifest_attributes_sources_and_failures() {
        let document = build_manifest(&scan(), &Logger::capturing());
        assert_eq!(document.metadata.updates_available, 2);
        assert_eq!(document.metadata.failed_lookups, 1);
        assert_eq!(document.packages["bash"].source, PackageSource::Pacman);
        assert_eq!(document.packages["bash"].repository.as_deref(), Some("core"));
        assert_eq!(document.packages["yay"].source, PackageSource::Aur);
    }

    #[test]
    fn test_write_manifest_emits_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("aur-manifest.json");
        let document = build_manifest(&scan(), &Logger::capturing());
        write_manifest(&document, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["packages"]["yay"]["source"], "AUR");
        assert_eq!(value["packages"]["yay"]["newer_version"], "12.4.2-1");
        assert_eq!(value["failures"][0]["item"], "batch 2 [zoom]");
        assert_eq!(value["metadata"]["generated_by"], "synsyu_aur");
    }
}
