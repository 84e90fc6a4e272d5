/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::package_info
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures describing inventory snapshots, foreign
    metadata records and upgrade candidates.

  Security / Safety Notes:
    Pure data container; no I/O performed in this module.

  Dependencies:
    None beyond std.

  Operational Scope:
    Used across inventory, resolver, scanner and manifest
    modules to pass package facts between stages.

  Revision History:
    2024-11-04 COD  Introduced shared VersionInfo type.
    2026-10-16 COD  Replaced VersionInfo with inventory entries.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Manifest shape kept separate from in-memory candidates
============================================================*/

use std::fmt;

/// Where an inventory entry was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Local,
    SyncRepo(String),
    Foreign,
}

/// Why a package was installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallReason {
    #[default]
    Explicit,
    Dependency,
}

/// Read-only snapshot of one package in an inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub name: String,
    pub version: String,
    pub origin: Origin,
    pub size_bytes: u64,
    pub install_reason: InstallReason,
    /// Provided names, optionally versioned (`name=version`).
    pub provides: Vec<String>,
    pub depends: Vec<String>,
    pub groups: Vec<String>,
    /// Unix seconds; zero when unknown.
    pub build_date: i64,
}

impl InventoryEntry {
    pub fn new(name: impl Into<String>, version: impl Into<String>, origin: Origin) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            origin,
            size_bytes: 0,
            install_reason: InstallReason::Explicit,
            provides: Vec::new(),
            depends: Vec::new(),
            groups: Vec::new(),
            build_date: 0,
        }
    }

    pub fn with_provides<I, S>(mut self, provides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides = provides.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = depends.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_build_date(mut self, build_date: i64) -> Self {
        self.build_date = build_date;
        self
    }
}

/// One record from the foreign metadata RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignRecord {
    pub name: String,
    pub package_base: String,
    pub version: String,
    pub last_modified: i64,
}

/// Where an upgrade would come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    Repo(String),
    Aur,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Repo(repo) => f.write_str(repo),
            CandidateSource::Aur => f.write_str("aur"),
        }
    }
}

/// An installed package with a newer version available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCandidate {
    pub name: String,
    pub source: CandidateSource,
    pub local_version: String,
    pub remote_version: String,
}

impl fmt::Display for UpgradeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {} -> {}",
            self.source, self.name, self.local_version, self.remote_version
        )
    }
}
