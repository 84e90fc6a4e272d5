/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Core of the Syn-Syu AUR helper: version ordering, dependency
    constraints, .SRCINFO parsing, target resolution, upgrade
    scanning and source mirror synchronisation.

  Security / Safety Notes:
    Operates within user privileges. Executes pacman and git,
    and performs HTTPS GET requests only.

  Dependencies:
    tokio runtime, reqwest, serde, thiserror.

  Operational Scope:
    Linked by the `synsyu-aur` binary and by orchestration
    layers that supply their own inventories.

  Revision History:
    2026-10-16 COD  Split library from binary entry point.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Explicit session object instead of global state
============================================================*/

pub mod aur;
pub mod config;
pub mod constraint;
pub mod error;
pub mod git;
pub mod inventory;
pub mod logger;
pub mod manifest;
pub mod mirror;
pub mod package_info;
pub mod pacman;
pub mod resolver;
pub mod session;
pub mod srcinfo;
pub mod upgrade;
pub mod version;

pub use error::{MultiError, Result, SynsyuError};
pub use session::Session;
