/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Syn-Syu AUR. Exposes version comparison,
    .SRCINFO inspection, target resolution, upgrade scanning
    and mirror synchronisation as subcommands.

  Security / Safety Notes:
    Operates within user privileges. Executes pacman/git
    commands and performs HTTPS GET requests only.

  Dependencies:
    clap for CLI parsing, chrono for timestamps.

  Operational Scope:
    Invoked by the Syn-Syu Bash layer or directly by operators.

  Revision History:
    2025-10-28 COD  Authored Syn-Syu Core runtime.
    2026-10-16 COD  Reworked into AUR helper subcommands.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};

use synsyu_aur::aur::AurClient;
use synsyu_aur::config::SynsyuConfig;
use synsyu_aur::logger::Logger;
use synsyu_aur::manifest::{build_manifest, write_manifest};
use synsyu_aur::mirror::MirrorSync;
use synsyu_aur::resolver::Resolver;
use synsyu_aur::srcinfo::{ArchValue, BuildDescription, PackageFields};
use synsyu_aur::upgrade::UpgradeScanner;
use synsyu_aur::version::vercmp;
use synsyu_aur::{Result, Session, SynsyuError};

/// Command-line arguments for Syn-Syu AUR.
#[derive(Debug, Parser)]
#[command(
    name = "synsyu-aur",
    version,
    author = "Synavera Systems",
    about = "AUR resolution and source mirror core for Syn-Syu"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH", global = true)]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare two versions; prints -1, 0 or 1.
    Vercmp { a: String, b: String },
    /// Parse a .SRCINFO file and print it in canonical form.
    Srcinfo {
        path: PathBuf,
        /// Print the effective fields of one split package instead.
        #[arg(long, value_name = "PKGNAME")]
        split: Option<String>,
    },
    /// Classify install targets against the local and sync databases.
    Resolve {
        #[arg(required = true)]
        targets: Vec<String>,
        /// Targets already resolved elsewhere.
        #[arg(long = "baseline", value_name = "NAME", action = ArgAction::Append)]
        baseline: Vec<String>,
    },
    /// List installed packages with newer versions available.
    Upgrades {
        /// Override manifest output path.
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,
        /// Do not write the manifest.
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Manage local source mirrors.
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
}

#[derive(Debug, Subcommand)]
enum SyncAction {
    /// Clone missing mirrors and fetch existing ones.
    Download { pkgbases: Vec<String> },
    /// List mirrors with unreviewed upstream changes.
    NeedsMerge { pkgbases: Vec<String> },
    /// Bring mirrors up to date with upstream.
    Merge { pkgbases: Vec<String> },
    /// Record the current state of mirrors as reviewed.
    MarkSeen { pkgbases: Vec<String> },
    /// Show unreviewed changes.
    Diff {
        pkgbases: Vec<String>,
        /// Write `<pkgbase>.diff` files into the clone directory.
        #[arg(long, action = ArgAction::SetTrue)]
        to_file: bool,
    },
    /// Build a temporary review directory of mirrors and diffs.
    Review { pkgbases: Vec<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Syn-Syu-AUR] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = SynsyuConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .or_else(|| Some(config.log_dir().join(format!("aur_{session_stamp}.log"))));
    let logger = Arc::new(Logger::new(log_path, cli.verbose)?);
    logger.info("INIT", "Syn-Syu AUR awakening.");

    let outcome = dispatch(cli.command, config, Arc::clone(&logger)).await;
    if let Err(err) = &outcome {
        logger.error("FAILED", err.to_string());
    }
    logger.finalize()?;
    outcome.map(|_| ExitCode::SUCCESS)
}

async fn dispatch(command: Command, config: SynsyuConfig, logger: Arc<Logger>) -> Result<()> {
    match command {
        Command::Vercmp { a, b } => {
            let code = match vercmp(&a, &b) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            };
            println!("{code}");
        }
        Command::Srcinfo { path, split } => {
            let desc = BuildDescription::parse_file(&path)?;
            match split {
                Some(name) => {
                    let pkg = desc.split_package(&name).ok_or_else(|| {
                        SynsyuError::Runtime(format!(
                            "{} does not build {name}",
                            path.display()
                        ))
                    })?;
                    print_split(&desc, &pkg);
                }
                None => print!("{}", desc.to_text()),
            }
        }
        Command::Resolve { targets, baseline } => {
            let session = Session::load(config, logger).await?;
            let resolver = Resolver::from_session(&session);
            let result = resolver.classify(&targets, Some(baseline.as_slice()))?;
            for name in &result.satisfied {
                println!("installed  {name}");
            }
            for target in &result.from_repo {
                println!(
                    "repo       {} -> {}/{}",
                    target.requested, target.repo, target.provider
                );
            }
            for group in &result.groups {
                println!(
                    "group      {}/{}: {}",
                    group.repo,
                    group.group,
                    group.members.join(" ")
                );
            }
            for name in &result.unresolved {
                println!("aur        {name}");
            }
        }
        Command::Upgrades { manifest, dry_run } => {
            let manifest_path = manifest.unwrap_or_else(|| config.manifest_path());
            let client = AurClient::new(&config.aur)?;
            let session = Session::load(config, Arc::clone(&logger)).await?;
            let scanner = UpgradeScanner::new(&session, Arc::new(client));
            let mut list = scanner.list().await?;

            for candidate in list.candidates() {
                println!("{candidate}");
            }
            if !dry_run {
                let document = build_manifest(&list, &logger);
                write_manifest(&document, &manifest_path)?;
                logger.info(
                    "MANIFEST",
                    format!("Manifest written to {}", manifest_path.display()),
                );
            }
            logger.info(
                "SUMMARY",
                format!(
                    "repo={} aur={} failed={}",
                    list.from_repo.len(),
                    list.foreign.len(),
                    list.failures.len()
                ),
            );
            std::mem::take(&mut list.failures).into_result()?;
        }
        Command::Sync { action } => {
            let sync = MirrorSync::new(&config.mirror, config.clone_dir(), logger);
            run_sync(&sync, action).await?;
        }
    }
    Ok(())
}

async fn run_sync(sync: &MirrorSync, action: SyncAction) -> Result<()> {
    match action {
        SyncAction::Download { pkgbases } => {
            let (fetched, failures) = sync.download(&pkgbases).await;
            for name in &fetched {
                println!("{name}");
            }
            failures.into_result()
        }
        SyncAction::NeedsMerge { pkgbases } => {
            for name in sync.needs_merge(&pkgbases).await? {
                println!("{name}");
            }
            Ok(())
        }
        SyncAction::Merge { pkgbases } => sync.merge(&pkgbases).await,
        SyncAction::MarkSeen { pkgbases } => sync.mark_seen(&pkgbases).await,
        SyncAction::Diff { pkgbases, to_file } => {
            if to_file {
                for path in sync.diffs_to_file(&pkgbases).await? {
                    println!("{}", path.display());
                }
                Ok(())
            } else {
                sync.print_diffs(&pkgbases).await
            }
        }
        SyncAction::Review { pkgbases } => {
            let written = sync.diffs_to_file(&pkgbases).await?;
            let diff_names: Vec<String> = written
                .iter()
                .filter_map(|path| path.file_stem())
                .map(|stem| stem.to_string_lossy().into_owned())
                .collect();
            let view = sync.make_review_view(&pkgbases, &diff_names).await?;
            println!("{}", view.display());
            Ok(())
        }
    }
}

fn print_split(desc: &BuildDescription, pkg: &PackageFields) {
    println!("pkgname = {}", pkg.pkgname);
    println!("version = {}", desc.full_version());
    if let Some(pkgdesc) = pkg.pkgdesc.as_deref().filter(|d| !d.is_empty()) {
        println!("pkgdesc = {pkgdesc}");
    }
    println!("arch = {}", pkg.arch.join(" "));
    print_arch_values("depends", &pkg.depends);
    print_arch_values("optdepends", &pkg.optdepends);
    print_arch_values("provides", &pkg.provides);
    print_arch_values("conflicts", &pkg.conflicts);
}

fn print_arch_values(key: &str, values: &[ArchValue]) {
    for entry in values.iter().filter(|entry| !entry.value.is_empty()) {
        match &entry.arch {
            Some(arch) => println!("{key}_{arch} = {}", entry.value),
            None => println!("{key} = {}", entry.value),
        }
    }
}
