//! git CLI wrapper
//!
//! Shells out to `git` the same way an operator would, so credential
//! helpers and SSH agents keep working unchanged.

use crate::error::{Result, SyncError};
use convoy_core::runtime::SourceControl;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// A git working tree rooted at `workdir`.
pub struct GitWorkspace {
    workdir: PathBuf,
    /// Remote used when resolving bare branch names.
    remote: String,
}

impl GitWorkspace {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            remote: "origin".to_string(),
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Run a git subcommand and capture stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        tracing::debug!("実行: git {}", args.join(" "));

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SyncError::GitNotFound
                } else {
                    SyncError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(classify_failure(args, stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Fetch a remote, pruning deleted refs.
    pub async fn fetch(&self, remote: &str) -> Result<()> {
        self.run(&["fetch", "--prune", remote]).await?;
        tracing::debug!("fetch完了: {}", remote);
        Ok(())
    }

    /// Resolve a revision to a commit hash.
    ///
    /// Tries the revision as given first, then as a remote-tracking ref
    /// so that bare branch names ("main") resolve after a fetch.
    pub async fn resolve(&self, remote: &str, revision: &str) -> Result<String> {
        let direct = format!("{revision}^{{commit}}");
        if let Ok(hash) = self
            .run(&["rev-parse", "--verify", "--quiet", direct.as_str()])
            .await
        {
            if !hash.is_empty() {
                return Ok(hash);
            }
        }

        let tracking = format!("{remote}/{revision}^{{commit}}");
        match self
            .run(&["rev-parse", "--verify", "--quiet", tracking.as_str()])
            .await
        {
            Ok(hash) if !hash.is_empty() => Ok(hash),
            _ => Err(SyncError::UnknownRevision(revision.to_string())),
        }
    }

    /// Hard-reset the working tree to a resolved commit.
    pub async fn reset_to(&self, commit: &str) -> Result<()> {
        self.run(&["reset", "--hard", commit]).await?;
        tracing::info!("作業ツリーを固定: {}", commit);
        Ok(())
    }

    /// fetch → resolve → reset in one step.
    pub async fn sync(&self, remote: &str, revision: &str) -> Result<String> {
        self.fetch(remote).await?;
        let commit = self.resolve(remote, revision).await?;
        self.reset_to(&commit).await?;
        Ok(commit)
    }
}

/// Map a failed git invocation onto a typed error.
fn classify_failure(args: &[&str], stderr: String) -> SyncError {
    let lowered = stderr.to_lowercase();

    if args.first() == Some(&"fetch")
        && (lowered.contains("could not resolve host")
            || lowered.contains("connection refused")
            || lowered.contains("could not read from remote")
            || lowered.contains("does not appear to be a git repository"))
    {
        let remote = args.last().unwrap_or(&"origin").to_string();
        return SyncError::RemoteUnreachable(remote);
    }

    SyncError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr,
    }
}

impl SourceControl for GitWorkspace {
    async fn fetch(&self, remote: &str) -> anyhow::Result<()> {
        GitWorkspace::fetch(self, remote).await?;
        Ok(())
    }

    async fn reset_hard(&self, revision: &str) -> anyhow::Result<()> {
        // fetch済みの前提で、直接→リモート追跡refの順に解決する
        let commit = self.resolve(&self.remote, revision).await?;
        self.reset_to(&commit).await?;
        Ok(())
    }
}
