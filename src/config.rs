/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load operator configuration for the AUR helper core: RPC
    endpoint and batching, mirror locations, git invocation and
    upgrade policy.

  Security / Safety Notes:
    Configuration is read from operator-owned paths only. Git
    environment overrides are passed verbatim to child processes.

  Dependencies:
    serde + toml for parsing, dirs for XDG locations.

  Operational Scope:
    Read once at start-up and carried by the session.

  Revision History:
    2024-11-04 COD  Introduced configuration loader.
    2026-10-16 COD  Added mirror and upgrade tables.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Safe defaults for every key
    - Explicit validation with actionable messages
============================================================*/

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SynsyuError};

const CONFIG_DIR: &str = "syn-syu";
const CONFIG_FILE: &str = "aur.toml";

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynsyuConfig {
    pub general: GeneralConfig,
    pub aur: AurConfig,
    pub mirror: MirrorConfig,
    pub upgrade: UpgradeConfig,
}

/// Paths for logs and manifests.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_dir: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
}

/// Foreign metadata RPC settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AurConfig {
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Names per info request (batch size).
    pub max_args: usize,
    pub max_retries: usize,
    /// Concurrent batch limit; 0 runs every batch at once.
    pub max_parallel_requests: usize,
    /// Response throttle; 0 disables.
    pub max_kib_per_sec: u64,
}

impl Default for AurConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aur.archlinux.org/rpc".into(),
            timeout: 30,
            max_args: 150,
            max_retries: 3,
            max_parallel_requests: 0,
            max_kib_per_sec: 0,
        }
    }
}

/// Local source mirror settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MirrorConfig {
    /// Base URL that `<pkgbase>.git` is appended to.
    pub aur_url: String,
    pub clone_dir: Option<PathBuf>,
    pub git_bin: String,
    pub git_flags: Vec<String>,
    pub git_env: BTreeMap<String, String>,
    /// Per-command timeout in seconds; 0 disables.
    pub git_timeout: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            aur_url: "https://aur.archlinux.org".into(),
            clone_dir: None,
            git_bin: "git".into(),
            git_flags: Vec::new(),
            git_env: BTreeMap::from([("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())]),
            git_timeout: 0,
        }
    }
}

/// Upgrade detection policy.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Treat a newer remote modification time as an upgrade.
    pub prefer_build_time: bool,
    /// Names never reported as upgrade candidates.
    pub ignore: Vec<String>,
}

impl SynsyuConfig {
    /// Load from an explicit path, else the default location, else defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            SynsyuError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml(&text)
            .map_err(|err| SynsyuError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|err| SynsyuError::Config(format!("Invalid TOML: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.aur.max_args == 0 {
            return Err(SynsyuError::Config("aur.max_args must be at least 1".into()));
        }
        if self.aur.base_url.trim().is_empty() {
            return Err(SynsyuError::Config("aur.base_url must not be empty".into()));
        }
        if self.mirror.git_bin.trim().is_empty() {
            return Err(SynsyuError::Config("mirror.git_bin must not be empty".into()));
        }
        Ok(())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.general
            .log_dir
            .clone()
            .unwrap_or_else(|| state_dir().join("logs"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.general
            .manifest_path
            .clone()
            .unwrap_or_else(|| state_dir().join("aur-manifest.json"))
    }

    pub fn clone_dir(&self) -> PathBuf {
        self.mirror.clone_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join(CONFIG_DIR)
                .join("aur")
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}
