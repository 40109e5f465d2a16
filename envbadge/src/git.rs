// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Local clone manipulation through the `git` command line.
///
/// Every command runs non-interactively. The access token embedded in the
/// remote URL is redacted from all error messages.
use std::{
    path::{Path, PathBuf},
    process::Output,
};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{config::CommitAuthor, error::Error};

/// Operations the publish pipeline performs on its local clone.
#[allow(async_fn_in_trait)]
pub trait Workspace
{
    /// Directory holding the clone.
    fn path(&self,) -> &Path;

    /// Clones `url` at `branch` into [`Workspace::path`].
    async fn clone_repository(&self, url: &str, branch: &str,) -> Result<(), Error,>;

    /// Sets `user.name` and `user.email` in the clone.
    async fn configure_identity(&self, author: &CommitAuthor,) -> Result<(), Error,>;

    /// Stages a path relative to the clone root.
    async fn add(&self, relative_path: &str,) -> Result<(), Error,>;

    /// Commits staged changes.
    async fn commit(&self, message: &str,) -> Result<(), Error,>;

    /// Creates `branch` from `HEAD` and checks it out.
    async fn create_branch(&self, branch: &str,) -> Result<(), Error,>;

    /// Force-pushes `branch` to `origin`.
    async fn push(&self, branch: &str,) -> Result<(), Error,>;

    /// Rebases `branch` onto the latest `origin/{base}` and force-pushes it.
    async fn sync_with_base(&self, branch: &str, base: &str,) -> Result<(), Error,>;
}

/// [`Workspace`] backed by the `git` binary.
#[derive(Clone,)]
pub struct GitCli
{
    dir:    PathBuf,
    secret: Option<String,>,
}

impl std::fmt::Debug for GitCli
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("GitCli",).field("dir", &self.dir,).finish_non_exhaustive()
    }
}

impl GitCli
{
    /// Creates a workspace rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf,>,) -> Self
    {
        Self {
            dir:    dir.into(),
            secret: None,
        }
    }

    /// Redacts `secret` from every reported git output.
    pub fn redacting(mut self, secret: impl Into<String,>,) -> Self
    {
        let secret = secret.into();
        self.secret = (!secret.is_empty()).then_some(secret,);
        self
    }

    fn redact(&self, text: &str,) -> String
    {
        match &self.secret {
            Some(secret,) => text.replace(secret.as_str(), "***",),
            None => text.to_owned(),
        }
    }

    async fn run_git(&self, args: &[&str],) -> Result<String, Error,>
    {
        let mut command = git_command();
        command.arg("-C",).arg(&self.dir,).args(args,);
        let output = self.execute(command, args,).await?;
        Ok(String::from_utf8_lossy(&output.stdout,).trim().to_owned(),)
    }

    async fn execute(&self, mut command: Command, args: &[&str],) -> Result<Output, Error,>
    {
        let rendered = self.redact(&args.join(" ",),);
        debug!(command = %rendered, "running git");

        let output = command
            .output()
            .await
            .map_err(|e| Error::git(format!("failed to spawn git {rendered}: {e}"),),)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr,);
            return Err(Error::git(format!(
                "git {rendered} failed: {}",
                self.redact(stderr.trim(),)
            ),),);
        }

        Ok(output,)
    }
}

fn git_command() -> Command
{
    let mut command = Command::new("git",);
    command.env("GIT_TERMINAL_PROMPT", "0",).kill_on_drop(true,);
    command
}

impl Workspace for GitCli
{
    fn path(&self,) -> &Path
    {
        &self.dir
    }

    async fn clone_repository(&self, url: &str, branch: &str,) -> Result<(), Error,>
    {
        let target = self.dir.to_string_lossy().into_owned();
        let args = ["clone", "--branch", branch, "--single-branch", url, target.as_str(),];
        let mut command = git_command();
        command.args(args,);
        self.execute(command, &args,).await?;
        info!(path = %self.dir.display(), branch, "cloned target repository");
        Ok((),)
    }

    async fn configure_identity(&self, author: &CommitAuthor,) -> Result<(), Error,>
    {
        self.run_git(&["config", "user.name", &author.name],).await?;
        self.run_git(&["config", "user.email", &author.email],).await?;
        Ok((),)
    }

    async fn add(&self, relative_path: &str,) -> Result<(), Error,>
    {
        self.run_git(&["add", "--", relative_path],).await.map(drop,)
    }

    async fn commit(&self, message: &str,) -> Result<(), Error,>
    {
        self.run_git(&["commit", "-m", message],).await?;
        let head = self.run_git(&["rev-parse", "--short", "HEAD"],).await?;
        info!(commit = %head, "committed badge: {message}");
        Ok((),)
    }

    async fn create_branch(&self, branch: &str,) -> Result<(), Error,>
    {
        self.run_git(&["checkout", "-b", branch],).await.map(drop,)
    }

    async fn push(&self, branch: &str,) -> Result<(), Error,>
    {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        self.run_git(&["push", "--force", "origin", &refspec],).await.map(drop,)
    }

    async fn sync_with_base(&self, branch: &str, base: &str,) -> Result<(), Error,>
    {
        let refspec = format!("+refs/heads/{base}:refs/remotes/origin/{base}");
        self.run_git(&["fetch", "--no-tags", "origin", &refspec],).await?;

        let upstream = format!("origin/{base}");
        if let Err(error,) = self.run_git(&["rebase", &upstream, branch],).await {
            if let Err(abort,) = self.run_git(&["rebase", "--abort"],).await {
                warn!("failed to abort rebase: {abort}");
            }
            return Err(error,);
        }

        self.push(branch,).await
    }
}
