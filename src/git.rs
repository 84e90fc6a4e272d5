/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::git
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Invoke the configured git executable with global flags,
    environment overrides and an optional per-command timeout.

  Security / Safety Notes:
    Arguments are passed as an argv vector; no shell is
    involved. Interactive prompts are disabled by default via
    the configured environment.

  Dependencies:
    tokio::process and tokio::time for async execution.

  Operational Scope:
    Sole path by which the mirror synchroniser touches git.

  Revision History:
    2026-10-16 COD  Introduced git runner.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic command invocation with explicit checks
    - Timeouts kill the child process
============================================================*/

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use crate::config::MirrorConfig;
use crate::error::{Result, SynsyuError};
use crate::pacman::map_spawn_error;

/// Configured git executable.
#[derive(Debug, Clone)]
pub struct GitRunner {
    bin: String,
    flags: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl GitRunner {
    pub fn new(config: &MirrorConfig) -> Self {
        Self {
            bin: config.git_bin.clone(),
            flags: config.git_flags.clone(),
            env: config.git_env.clone(),
            timeout: (config.git_timeout > 0).then(|| Duration::from_secs(config.git_timeout)),
        }
    }

    /// Run and return trimmed stdout; a non-zero exit is an error.
    pub async fn output<I, S>(&self, dir: Option<&Path>, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (rendered, output) = self.exec(dir, args).await?;
        if !output.status.success() {
            return Err(SynsyuError::CommandFailure {
                command: rendered,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Run for effect; a non-zero exit is an error.
    pub async fn run<I, S>(&self, dir: Option<&Path>, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.output(dir, args).await.map(|_| ())
    }

    /// Run as a predicate: exit 0 is `true`, exit 1 is `false`, anything
    /// else is an error.
    pub async fn check<I, S>(&self, dir: Option<&Path>, args: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (rendered, output) = self.exec(dir, args).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            code => Err(SynsyuError::CommandFailure {
                command: rendered,
                status: code.unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    async fn exec<I, S>(&self, dir: Option<&Path>, args: I) -> Result<(String, Output)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.bin);
        let mut rendered = vec![self.bin.clone()];
        if let Some(dir) = dir {
            command.arg("-C").arg(dir);
            rendered.push(format!("-C {}", dir.display()));
        }
        command.args(&self.flags);
        rendered.extend(self.flags.iter().cloned());
        for arg in args {
            rendered.push(arg.as_ref().to_string_lossy().into_owned());
            command.arg(arg.as_ref());
        }
        command
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let rendered = rendered.join(" ");

        let pending = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                SynsyuError::Runtime(format!("`{rendered}` timed out after {}s", limit.as_secs()))
            })?,
            None => pending.await,
        }
        .map_err(|err| map_spawn_error(err, &self.bin))?;
        Ok((rendered, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let config = MirrorConfig {
            git_bin: "synsyu-no-such-git".into(),
            ..MirrorConfig::default()
        };
        let err = GitRunner::new(&config)
            .run(None, ["--version"])
            .await
            .unwrap_err();
        assert!(matches!(err, SynsyuError::CommandMissing { .. }));
    }

    #[tokio::test]
    async fn test_failure_carries_rendered_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = GitRunner::new(&MirrorConfig::default());
        let err = runner
            .output(Some(dir.path()), ["rev-parse", "HEAD"])
            .await
            .unwrap_err();
        match err {
            SynsyuError::CommandFailure { command, .. } => {
                assert!(command.starts_with("git -C "));
                assert!(command.ends_with("rev-parse HEAD"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
