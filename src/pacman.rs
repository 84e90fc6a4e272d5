/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::pacman
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Interface with pacman to snapshot the local package
    database and the configured sync repositories.

  Security / Safety Notes:
    Executes pacman with user privileges only; no privilege
    escalation is attempted and no transaction is started.

  Dependencies:
    tokio::process for async command execution, chrono for
    build date parsing.

  Operational Scope:
    Supplies Syn-Syu AUR with inventory snapshots once per
    resolution or upgrade pass.

  Revision History:
    2024-11-04 COD  Crafted pacman integration layer.
    2026-10-16 COD  Reworked into inventory snapshot loader.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic command invocation with explicit checks
    - Structured parsing with clear failure modes
    - Reusable helpers for external command diagnostics
============================================================*/

use std::io;
use std::process::Stdio;

use chrono::NaiveDateTime;
use tokio::process::Command;

use crate::error::{Result, SynsyuError};
use crate::inventory::PackageDb;
use crate::package_info::{InstallReason, InventoryEntry, Origin};

/// Snapshot the local database via `pacman -Qi`.
pub async fn load_local_db() -> Result<PackageDb> {
    let stdout = run_pacman(&["-Qi"]).await?;
    let entries = parse_info_blocks(&stdout, |_| Origin::Local);
    Ok(PackageDb::new("local", entries))
}

/// Snapshot every sync repository via `pacman -Si`, in configured order.
pub async fn load_sync_dbs() -> Result<Vec<PackageDb>> {
    let stdout = run_pacman(&["-Si"]).await?;
    let entries = parse_info_blocks(&stdout, |repo| match repo {
        Some(repo) => Origin::SyncRepo(repo.to_string()),
        None => Origin::Foreign,
    });

    let mut order: Vec<String> = Vec::new();
    let mut grouped: Vec<Vec<InventoryEntry>> = Vec::new();
    for entry in entries {
        let Origin::SyncRepo(repo) = &entry.origin else {
            continue;
        };
        let idx = match order.iter().position(|known| known == repo) {
            Some(idx) => idx,
            None => {
                order.push(repo.clone());
                grouped.push(Vec::new());
                order.len() - 1
            }
        };
        grouped[idx].push(entry);
    }

    Ok(order
        .into_iter()
        .zip(grouped)
        .map(|(repo, entries)| PackageDb::new(repo, entries))
        .collect())
}

async fn run_pacman(args: &[&str]) -> Result<String> {
    let output = Command::new("pacman")
        .args(args)
        .env("LC_ALL", "C")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|err| map_spawn_error(err, "pacman"))?;

    if !output.status.success() {
        return Err(SynsyuError::CommandFailure {
            command: format!("pacman {}", args.join(" ")),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|err| {
        SynsyuError::Serialization(format!(
            "pacman {} emitted invalid UTF-8: {err}",
            args.join(" ")
        ))
    })
}

/// Parse `pacman -Qi`/`-Si` output into entries.
///
/// `origin_for` receives the block's `Repository` value, if any.
pub fn parse_info_blocks<F>(stdout: &str, origin_for: F) -> Vec<InventoryEntry>
where
    F: Fn(Option<&str>) -> Origin,
{
    let mut packages = Vec::new();
    for block in stdout.split("\n\n") {
        let mut name: Option<String> = None;
        let mut version: Option<String> = None;
        let mut repository: Option<String> = None;
        let mut provides = Vec::new();
        let mut depends = Vec::new();
        let mut groups = Vec::new();
        let mut install_reason = InstallReason::Explicit;
        let mut size_bytes = 0;
        let mut build_date = 0;

        for line in block.lines() {
            if let Some((raw_key, raw_value)) = line.split_once(" : ") {
                let key = raw_key.trim();
                let value = raw_value.trim();
                match key {
                    "Name" => name = Some(value.to_string()),
                    "Version" => version = Some(value.to_string()),
                    "Repository" => repository = Some(value.to_string()),
                    "Provides" => provides = split_list(value),
                    "Depends On" => depends = split_list(value),
                    "Groups" => groups = split_list(value),
                    "Install Reason" => {
                        if value.starts_with("Installed as a dependency") {
                            install_reason = InstallReason::Dependency;
                        }
                    }
                    "Installed Size" => size_bytes = parse_pacman_size(value).unwrap_or(0),
                    "Build Date" => build_date = parse_build_date(value).unwrap_or(0),
                    _ => {}
                }
            }
        }

        if let (Some(name), Some(version)) = (name, version) {
            packages.push(InventoryEntry {
                name,
                version,
                origin: origin_for(repository.as_deref()),
                size_bytes,
                install_reason,
                provides,
                depends,
                groups,
                build_date,
            });
        }
    }
    packages
}

fn split_list(value: &str) -> Vec<String> {
    if value == "None" {
        return Vec::new();
    }
    value.split_whitespace().map(str::to_string).collect()
}

fn parse_build_date(value: &str) -> Option<i64> {
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, "%a %b %d %H:%M:%S %Y")
        .ok()
        .map(|date| date.and_utc().timestamp())
}

fn parse_pacman_size(value: &str) -> Option<u64> {
    let mut parts = value.split_whitespace();
    let number = parts.next()?.replace(',', "");
    let unit = parts.next().unwrap_or("B");
    let magnitude = number.parse::<f64>().ok()?;
    let multiplier = match unit {
        "B" => 1_f64,
        "KiB" => 1024_f64,
        "MiB" => 1024_f64.powi(2),
        "GiB" => 1024_f64.powi(3),
        "TiB" => 1024_f64.powi(4),
        _ => 1_f64,
    };
    let bytes = magnitude * multiplier;
    if bytes.is_finite() && bytes >= 0.0 {
        Some(bytes.round() as u64)
    } else {
        None
    }
}

pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> SynsyuError {
    if err.kind() == io::ErrorKind::NotFound {
        SynsyuError::CommandMissing {
            command: command.into(),
        }
    } else {
        SynsyuError::Runtime(format!("Failed to spawn {command}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QI_OUTPUT: &str = "\
Name            : curl
Version         : 8.10.1-1
Description     : command line tool and library for transferring data with URLs
Provides        : libcurl.so=4-64
Depends On      : ca-certificates  krb5  libssh2  openssl  zlib
Optional Deps   : None
Required By     : git
Groups          : None
Installed Size  : 1864.46 KiB
Build Date      : Wed Sep 18 18:13:02 2024
Install Reason  : Installed as a dependency for another package

Name            : yay-bin
Version         : 12.4.2-1
Provides        : yay
Depends On      : pacman>=6.1  git
Groups          : None
Installed Size  : 8.13 MiB
Build Date      : Mon Sep  2 09:01:44 2024
Install Reason  : Explicitly installed
";

    #[test]
    fn test_parse_local_blocks() {
        let entries = parse_info_blocks(QI_OUTPUT, |_| Origin::Local);
        assert_eq!(entries.len(), 2);

        let curl = &entries[0];
        assert_eq!(curl.name, "curl");
        assert_eq!(curl.version, "8.10.1-1");
        assert_eq!(curl.provides, vec!["libcurl.so=4-64"]);
        assert_eq!(curl.depends.len(), 5);
        assert!(curl.groups.is_empty());
        assert_eq!(curl.install_reason, InstallReason::Dependency);
        assert_eq!(curl.size_bytes, 1_909_207);
        assert_eq!(curl.build_date, 1_726_683_182);

        let yay = &entries[1];
        assert_eq!(yay.install_reason, InstallReason::Explicit);
        assert_eq!(yay.depends, vec!["pacman>=6.1", "git"]);
        assert_eq!(yay.build_date, 1_725_267_704);
    }

    #[test]
    fn test_parse_sync_blocks_keep_repository() {
        let text = "Repository      : core\nName            : glibc\nVersion         : 2.40-1\n\n\
                    Repository      : extra\nName            : xterm\nVersion         : 395-1\nGroups          : xorg-apps\n";
        let entries = parse_info_blocks(text, |repo| {
            Origin::SyncRepo(repo.unwrap_or_default().to_string())
        });
        assert_eq!(entries[0].origin, Origin::SyncRepo("core".into()));
        assert_eq!(entries[1].origin, Origin::SyncRepo("extra".into()));
        assert_eq!(entries[1].groups, vec!["xorg-apps"]);
    }

    #[test]
    fn test_parse_pacman_size_units() {
        assert_eq!(parse_pacman_size("0.00 B"), Some(0));
        assert_eq!(parse_pacman_size("1.00 MiB"), Some(1_048_576));
        assert_eq!(parse_pacman_size("garbage"), None);
    }
}
