/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::session
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Bundle configuration, logger and inventory snapshots into
    one explicit object passed to every subsystem.

  Security / Safety Notes:
    Holds read-only snapshots; nothing here mutates system state.

  Dependencies:
    crate::pacman for snapshot loading.

  Operational Scope:
    Constructed once per invocation by the binary or by library
    callers supplying their own inventories.

  Revision History:
    2026-10-16 COD  Introduced explicit session object.
  ------------------------------------------------------------
  SSE Principles Observed:
    - No global state
    - Snapshots taken once per pass
============================================================*/

use std::sync::Arc;

use crate::config::SynsyuConfig;
use crate::error::Result;
use crate::inventory::{LocalInventory, SyncRepository};
use crate::logger::Logger;
use crate::pacman::{load_local_db, load_sync_dbs};

/// Everything a resolution, scan or mirror pass needs.
pub struct Session {
    pub config: SynsyuConfig,
    pub logger: Arc<Logger>,
    pub local: Arc<dyn LocalInventory>,
    pub repos: Vec<Arc<dyn SyncRepository>>,
}

impl Session {
    pub fn new(
        config: SynsyuConfig,
        logger: Arc<Logger>,
        local: Arc<dyn LocalInventory>,
        repos: Vec<Arc<dyn SyncRepository>>,
    ) -> Self {
        Self {
            config,
            logger,
            local,
            repos,
        }
    }

    /// Snapshot the system package databases through pacman.
    pub async fn load(config: SynsyuConfig, logger: Arc<Logger>) -> Result<Self> {
        let local = load_local_db().await?;
        let repos = load_sync_dbs().await?;
        logger.info(
            "INVENTORY",
            format!(
                "Snapshot: {} installed, {} sync repositories",
                local.len(),
                repos.len()
            ),
        );
        let repos = repos
            .into_iter()
            .map(|repo| Arc::new(repo) as Arc<dyn SyncRepository>)
            .collect();
        Ok(Self::new(config, logger, Arc::new(local), repos))
    }
}
