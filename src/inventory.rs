/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::inventory
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Define the narrow query contract consumed from the local
    package database and the sync repositories, plus a snapshot
    implementation of that contract.

  Security / Safety Notes:
    Read-only view; snapshots are never mutated after loading.

  Dependencies:
    crate::constraint for satisfier matching.

  Operational Scope:
    Backs the resolver and upgrade scanner for one pass.

  Revision History:
    2026-10-16 COD  Introduced inventory contract and snapshots.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Narrow interfaces at external boundaries
    - Deterministic lookup order
============================================================*/

use std::collections::HashMap;

use crate::constraint::{bare_name, Constraint};
use crate::error::Result;
use crate::package_info::InventoryEntry;

/// Query contract for the locally installed package database.
pub trait LocalInventory: Send + Sync {
    fn lookup_by_name(&self, name: &str) -> Result<Option<InventoryEntry>>;
    fn enumerate_all(&self) -> Result<Vec<InventoryEntry>>;
    /// First installed package whose name or provides meet `dependency`.
    fn find_satisfier(&self, dependency: &str) -> Result<Option<InventoryEntry>>;
    fn reverse_dependents(&self, name: &str) -> Result<Vec<String>>;
}

/// Query contract for one configured sync repository.
pub trait SyncRepository: Send + Sync {
    fn name(&self) -> &str;
    fn lookup_by_name(&self, name: &str) -> Result<Option<InventoryEntry>>;
    fn group_members(&self, group: &str) -> Result<Vec<InventoryEntry>>;
    fn find_satisfier(&self, dependency: &str) -> Result<Option<InventoryEntry>>;
    fn packages(&self) -> Result<Vec<InventoryEntry>>;
}

/// True when `entry` (by name or by a provide) meets `constraint`.
///
/// An unversioned provide only satisfies an unversioned constraint.
pub fn satisfies(entry: &InventoryEntry, constraint: &Constraint) -> bool {
    if entry.name == constraint.name && constraint.allows(&entry.version) {
        return true;
    }
    entry
        .provides
        .iter()
        .any(|provide| match provide.split_once('=') {
            Some((name, version)) => name == constraint.name && constraint.allows(version),
            None => *provide == constraint.name && constraint.is_unversioned(),
        })
}

/// Immutable snapshot of one package database.
#[derive(Debug, Clone, Default)]
pub struct PackageDb {
    name: String,
    entries: Vec<InventoryEntry>,
    by_name: HashMap<String, usize>,
}

impl PackageDb {
    pub fn new(name: impl Into<String>, entries: Vec<InventoryEntry>) -> Self {
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.name.clone(), idx))
            .collect();
        Self {
            name: name.into(),
            entries,
            by_name,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&InventoryEntry> {
        self.by_name.get(name).map(|idx| &self.entries[*idx])
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    // A literal name match wins over providers; providers are searched in
    // snapshot order.
    fn satisfier(&self, dependency: &str) -> Result<Option<InventoryEntry>> {
        let constraint = Constraint::parse(dependency)?;
        if let Some(entry) = self.get(&constraint.name) {
            if satisfies(entry, &constraint) {
                return Ok(Some(entry.clone()));
            }
        }
        Ok(self
            .entries
            .iter()
            .find(|entry| entry.name != constraint.name && satisfies(entry, &constraint))
            .cloned())
    }
}

impl LocalInventory for PackageDb {
    fn lookup_by_name(&self, name: &str) -> Result<Option<InventoryEntry>> {
        Ok(self.get(name).cloned())
    }

    fn enumerate_all(&self) -> Result<Vec<InventoryEntry>> {
        Ok(self.entries.clone())
    }

    fn find_satisfier(&self, dependency: &str) -> Result<Option<InventoryEntry>> {
        self.satisfier(dependency)
    }

    fn reverse_dependents(&self, name: &str) -> Result<Vec<String>> {
        let mut provided: Vec<&str> = vec![name];
        if let Some(entry) = self.get(name) {
            provided.extend(entry.provides.iter().map(|p| bare_name(p)));
        }
        let mut dependents: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.name != name)
            .filter(|entry| {
                entry
                    .depends
                    .iter()
                    .any(|dep| provided.contains(&bare_name(dep)))
            })
            .map(|entry| entry.name.clone())
            .collect();
        dependents.sort();
        Ok(dependents)
    }
}

impl SyncRepository for PackageDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup_by_name(&self, name: &str) -> Result<Option<InventoryEntry>> {
        Ok(self.get(name).cloned())
    }

    fn group_members(&self, group: &str) -> Result<Vec<InventoryEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.groups.iter().any(|g| g == group))
            .cloned()
            .collect())
    }

    fn find_satisfier(&self, dependency: &str) -> Result<Option<InventoryEntry>> {
        self.satisfier(dependency)
    }

    fn packages(&self) -> Result<Vec<InventoryEntry>> {
        Ok(self.entries.clone())
    }
}
