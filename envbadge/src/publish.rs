// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Badge publication pipeline.
///
/// Compares the published badge with the requested version, and when they
/// differ commits the new badge to a branch of the target repository, opens a
/// pull request and merges it with branch protection bypassed. The local clone
/// is removed after every run that reached the clone step.
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    badge::{render_badge, write_badge},
    config::PublishRequest,
    error::Error,
    git::Workspace,
    github::{PullRequestDraft, PullRequestHost, PullRequestRef},
    retry::{RetryPolicy, retry_fixed},
    version::VersionCheck,
};

/// Result of a publication run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome
{
    /// The published badge already shows the requested version.
    Unchanged
    {
        /// Version found in the published badge.
        version: String,
    },
    /// The pull request was merged.
    Merged
    {
        /// Merged pull request.
        pull_request: PullRequestRef,
        /// Attempt on which the merge succeeded.
        attempts:     u32,
    },
    /// Every merge attempt failed; the pull request stays open.
    MergeFailed
    {
        /// Pull request left open.
        pull_request: PullRequestRef,
        /// Attempts performed.
        attempts:     u32,
    },
}

impl PublishOutcome
{
    /// Returns `false` only when the pull request could not be merged.
    pub fn is_success(&self,) -> bool
    {
        !matches!(self, Self::MergeFailed { .. })
    }
}

/// Fetches the published badge and compares it with the requested version.
///
/// # Errors
///
/// Returns [`Error::GitHub`] when the badge cannot be fetched for a reason
/// other than its absence.
pub async fn check_remote<H,>(host: &H, request: &PublishRequest,) -> Result<VersionCheck, Error,>
where
    H: PullRequestHost,
{
    let remote = host.fetch_file(&request.badge_path(), request.base_branch(),).await?;
    Ok(VersionCheck::evaluate(remote.as_deref(), request.version(),),)
}

/// Runs the full publication pipeline.
///
/// A fetch failure during the remote check is logged and treated as a
/// missing badge.
///
/// # Errors
///
/// Returns an [`Error`] when any step before the merge loop fails: preparing
/// the clone directory, cloning, committing, pushing or opening the pull
/// request. Merge failures are reported through
/// [`PublishOutcome::MergeFailed`].
///
/// The clone directory must be absent, empty, or a leftover git clone.
/// Anything else is refused with [`Error::Workspace`] and left untouched.
pub async fn publish<H, W,>(
    host: &H,
    workspace: &W,
    request: &PublishRequest,
) -> Result<PublishOutcome, Error,>
where
    H: PullRequestHost,
    W: Workspace,
{
    let check = match check_remote(host, request,).await {
        Ok(check,) => check,
        Err(error,) => {
            warn!("could not read published badge, continuing as if missing: {error}");
            VersionCheck::Missing
        }
    };

    match check {
        VersionCheck::Unchanged {
            version,
        } => {
            info!(%version, path = %request.badge_path(), "published badge is up to date");
            return Ok(PublishOutcome::Unchanged {
                version,
            },);
        }
        VersionCheck::Missing => info!(path = %request.badge_path(), "no published badge found"),
        VersionCheck::Changed {
            previous,
        } => info!(
            previous = previous.as_deref().unwrap_or("unknown"),
            version = request.version(),
            "published badge is outdated"
        ),
    }

    prepare_directory(workspace.path(),).await?;
    let result = publish_changes(host, workspace, request,).await;
    remove_clone(workspace.path(),).await;
    result
}

async fn publish_changes<H, W,>(
    host: &H,
    workspace: &W,
    request: &PublishRequest,
) -> Result<PublishOutcome, Error,>
where
    H: PullRequestHost,
    W: Workspace,
{
    let url = request.remote_url();
    let url = url.as_str();
    let base = request.base_branch();
    retry_fixed(&RetryPolicy::CLONE, "clone", move || workspace.clone_repository(url, base,),)
        .await?;

    workspace.configure_identity(&request.settings().author,).await?;

    let badge_path = request.badge_path();
    let badge = render_badge(request.environment(), request.version(),);
    write_badge(&workspace.path().join(&badge_path,), &badge.svg,)?;
    debug!(path = %badge_path, width = badge.layout.total_width(), "badge written");

    workspace.add(&badge_path,).await?;
    workspace.commit(&request.commit_message(),).await?;

    let branch = request.pr_branch();
    let branch = branch.as_str();
    workspace.create_branch(branch,).await?;
    retry_fixed(&RetryPolicy::PUSH, "push", move || workspace.push(branch,),).await?;
    info!(branch, "pushed badge branch");

    let draft = PullRequestDraft {
        title: request.commit_message(),
        head:  branch.to_owned(),
        base:  base.to_owned(),
        body:  request.pr_body(),
    };
    let draft = &draft;
    let pull_request = retry_fixed(&RetryPolicy::PULL_REQUEST, "create pull request", move || {
        host.create_pull_request(draft,)
    },)
    .await?;
    info!(
        number = pull_request.number,
        url = pull_request.html_url.as_deref().unwrap_or_default(),
        "opened pull request"
    );

    annotate(host, request, pull_request.number,).await;

    Ok(merge_loop(host, workspace, request, pull_request,).await,)
}

async fn annotate<H,>(host: &H, request: &PublishRequest, number: u64,)
where
    H: PullRequestHost,
{
    let settings = request.settings();
    match host.add_labels(number, std::slice::from_ref(&settings.label,),).await {
        Ok((),) => debug!(number, label = %settings.label, "label added"),
        Err(error,) => warn!(number, "failed to add label '{}': {error}", settings.label),
    }

    let Some(title,) = settings.milestone.as_deref() else {
        return;
    };

    match host.find_milestone(title,).await {
        Ok(Some(milestone,),) => match host.set_milestone(number, milestone,).await {
            Ok((),) => debug!(number, milestone, "milestone assigned"),
            Err(error,) => warn!(number, "failed to assign milestone '{title}': {error}"),
        },
        Ok(None,) => info!("milestone '{title}' not found, skipping"),
        Err(error,) => warn!("failed to look up milestone '{title}': {error}"),
    }
}

async fn merge_loop<H, W,>(
    host: &H,
    workspace: &W,
    request: &PublishRequest,
    pull_request: PullRequestRef,
) -> PublishOutcome
where
    H: PullRequestHost,
    W: Workspace,
{
    let max_attempts = request.settings().merge_attempts.max(1,);
    let branch = request.pr_branch();
    let number = pull_request.number;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}",)
            .unwrap_or_else(|_| ProgressStyle::default_spinner(),),
    );

    for attempt in 1..=max_attempts {
        pb.set_message(format!("Merging pull request #{number} ({attempt}/{max_attempts})..."),);

        if let Err(error,) = workspace.sync_with_base(&branch, request.base_branch(),).await {
            warn!(attempt, max_attempts, "failed to update pull request branch: {error}");
            continue;
        }

        match host.merge(number,).await {
            Ok(true,) => {
                pb.finish_and_clear();
                info!(number, attempt, "pull request merged");
                if let Err(error,) = host.delete_branch(&branch,).await {
                    warn!(branch = %branch, "failed to delete merged branch: {error}");
                }
                return PublishOutcome::Merged {
                    pull_request,
                    attempts: attempt,
                };
            }
            Ok(false,) => warn!(attempt, max_attempts, number, "merge was not performed"),
            Err(error,) => warn!(attempt, max_attempts, "merge attempt failed: {error}"),
        }
    }

    pb.finish_and_clear();
    error!(number, max_attempts, "failed to merge pull request");
    PublishOutcome::MergeFailed {
        pull_request,
        attempts: max_attempts,
    }
}

async fn prepare_directory(path: &Path,) -> Result<(), Error,>
{
    let workspace_error = |source: std::io::Error| Error::Workspace {
        path: path.to_path_buf(),
        source,
    };

    if !tokio::fs::try_exists(path,).await.map_err(workspace_error,)? {
        return Ok((),);
    }

    if tokio::fs::try_exists(path.join(".git",),).await.map_err(workspace_error,)? {
        debug!(path = %path.display(), "removing stale clone directory");
        return tokio::fs::remove_dir_all(path,).await.map_err(workspace_error,);
    }

    let mut entries = tokio::fs::read_dir(path,).await.map_err(workspace_error,)?;
    if entries.next_entry().await.map_err(workspace_error,)?.is_some() {
        return Err(workspace_error(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "directory is not empty and is not a git clone",
        ),),);
    }
    Ok((),)
}

async fn remove_clone(path: &Path,)
{
    match tokio::fs::remove_dir_all(path,).await {
        Ok((),) => debug!(path = %path.display(), "clone directory removed"),
        Err(error,) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error,) => warn!(path = %path.display(), "failed to remove clone directory: {error}"),
    }
}

#[cfg(test)]
mod tests
{
    use std::{
        fs,
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::config::{CommitAuthor, PublishInputs, Settings};

    #[derive(Debug, Default,)]
    struct HostState
    {
        published:       Option<String,>,
        fetch_fails:     bool,
        create_failures: u32,
        labels_fail:     bool,
        milestone:       Option<u64,>,
        merge_results:   Vec<bool,>,
        created:         Vec<PullRequestDraft,>,
        labels:          Vec<String,>,
        milestones_set:  Vec<(u64, u64,),>,
        merge_calls:     u32,
        deleted:         Vec<String,>,
    }

    #[derive(Debug, Clone, Default,)]
    struct FakeHost
    {
        state: Arc<Mutex<HostState,>,>,
    }

    impl FakeHost
    {
        fn with(configure: impl FnOnce(&mut HostState,),) -> Self
        {
            let host = Self::default();
            configure(&mut host.state(),);
            host
        }

        fn state(&self,) -> std::sync::MutexGuard<'_, HostState,>
        {
            self.state.lock().expect("host state poisoned",)
        }
    }

    impl PullRequestHost for FakeHost
    {
        async fn fetch_file(&self, _path: &str, _reference: &str,) -> Result<Option<String,>, Error,>
        {
            let state = self.state();
            if state.fetch_fails {
                return Err(Error::github("contents API unavailable",),);
            }
            Ok(state.published.clone(),)
        }

        async fn create_pull_request(
            &self,
            draft: &PullRequestDraft,
        ) -> Result<PullRequestRef, Error,>
        {
            let mut state = self.state();
            if state.create_failures > 0 {
                state.create_failures -= 1;
                return Err(Error::github("secondary rate limit",),);
            }
            state.created.push(draft.clone(),);
            Ok(PullRequestRef {
                number:   17,
                html_url: Some("https://github.com/acme/badge-deploy/pull/17".to_owned(),),
            },)
        }

        async fn add_labels(&self, _number: u64, labels: &[String],) -> Result<(), Error,>
        {
            let mut state = self.state();
            if state.labels_fail {
                return Err(Error::github("label endpoint failed",),);
            }
            state.labels.extend_from_slice(labels,);
            Ok((),)
        }

        async fn find_milestone(&self, title: &str,) -> Result<Option<u64,>, Error,>
        {
            assert_eq!(title, "Badges");
            Ok(self.state().milestone,)
        }

        async fn set_milestone(&self, number: u64, milestone: u64,) -> Result<(), Error,>
        {
            self.state().milestones_set.push((number, milestone,),);
            Ok((),)
        }

        async fn merge(&self, _number: u64,) -> Result<bool, Error,>
        {
            let mut state = self.state();
            let index = state.merge_calls as usize;
            state.merge_calls += 1;
            match state.merge_results.get(index,) {
                Some(true,) => Ok(true,),
                Some(false,) => Ok(false,),
                None => Err(Error::github("405 Pull Request is not mergeable",),),
            }
        }

        async fn delete_branch(&self, branch: &str,) -> Result<(), Error,>
        {
            self.state().deleted.push(branch.to_owned(),);
            Ok((),)
        }
    }

    #[derive(Debug, Default,)]
    struct WorkspaceState
    {
        clone_failures:   u32,
        clone_calls:      u32,
        stale_at_clone:   bool,
        sync_failures:    u32,
        sync_calls:       u32,
        committed_badge:  Option<String,>,
        commit_messages:  Vec<String,>,
        branches:         Vec<String,>,
        pushes:           u32,
        push_failures:    u32,
        identity:         Option<CommitAuthor,>,
    }

    #[derive(Debug, Clone,)]
    struct FakeWorkspace
    {
        dir:   PathBuf,
        state: Arc<Mutex<WorkspaceState,>,>,
    }

    impl FakeWorkspace
    {
        fn new(root: &TempDir,) -> Self
        {
            Self::at(root.path().join("clone",),)
        }

        fn at(dir: PathBuf,) -> Self
        {
            Self {
                dir,
                state: Arc::default(),
            }
        }

        fn state(&self,) -> std::sync::MutexGuard<'_, WorkspaceState,>
        {
            self.state.lock().expect("workspace state poisoned",)
        }
    }

    impl Workspace for FakeWorkspace
    {
        fn path(&self,) -> &Path
        {
            &self.dir
        }

        async fn clone_repository(&self, url: &str, branch: &str,) -> Result<(), Error,>
        {
            assert!(url.starts_with("https://x-access-token:"));
            assert_eq!(branch, "main");
            let mut state = self.state();
            state.clone_calls += 1;
            state.stale_at_clone |= self.dir.join("stale.txt",).exists();
            fs::create_dir_all(&self.dir,).expect("failed to create clone dir",);
            if state.clone_failures > 0 {
                state.clone_failures -= 1;
                return Err(Error::git("git clone failed: connection reset",),);
            }
            Ok((),)
        }

        async fn configure_identity(&self, author: &CommitAuthor,) -> Result<(), Error,>
        {
            self.state().identity = Some(author.clone(),);
            Ok((),)
        }

        async fn add(&self, relative_path: &str,) -> Result<(), Error,>
        {
            let svg = fs::read_to_string(self.dir.join(relative_path,),)
                .map_err(|e| Error::git(format!("add failed: {e}"),),)?;
            self.state().committed_badge = Some(svg,);
            Ok((),)
        }

        async fn commit(&self, message: &str,) -> Result<(), Error,>
        {
            self.state().commit_messages.push(message.to_owned(),);
            Ok((),)
        }

        async fn create_branch(&self, branch: &str,) -> Result<(), Error,>
        {
            self.state().branches.push(branch.to_owned(),);
            Ok((),)
        }

        async fn push(&self, _branch: &str,) -> Result<(), Error,>
        {
            let mut state = self.state();
            state.pushes += 1;
            if state.push_failures > 0 {
                state.push_failures -= 1;
                return Err(Error::git("git push failed: remote rejected",),);
            }
            Ok((),)
        }

        async fn sync_with_base(&self, _branch: &str, base: &str,) -> Result<(), Error,>
        {
            assert_eq!(base, "main");
            let mut state = self.state();
            state.sync_calls += 1;
            if state.sync_failures > 0 {
                state.sync_failures -= 1;
                return Err(Error::git("rebase conflict",),);
            }
            Ok((),)
        }
    }

    fn inputs() -> PublishInputs
    {
        PublishInputs {
            environment: "production".to_owned(),
            version:     "1.4.0".to_owned(),
            token:       "ghs_secret".to_owned(),
            branch:      "main".to_owned(),
            target:      "acme/badge-deploy".to_owned(),
            source:      "acme/payments".to_owned(),
        }
    }

    fn request() -> PublishRequest
    {
        PublishRequest::new(inputs(), Settings::default(),).expect("valid request",)
    }

    #[tokio::test(start_paused = true)]
    async fn same_version_is_a_no_op()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| {
            state.published = Some(render_badge("production", "1.4.0",).svg,);
        },);
        let workspace = FakeWorkspace::new(&root,);

        let outcome = publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert_eq!(
            outcome,
            PublishOutcome::Unchanged {
                version: "1.4.0".to_owned(),
            }
        );
        assert_eq!(workspace.state().clone_calls, 0);
        assert!(host.state().created.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn outdated_badge_is_committed_and_merged()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| {
            state.published = Some(render_badge("production", "1.3.9",).svg,);
            state.milestone = Some(4,);
            state.merge_results = vec![true];
        },);
        let workspace = FakeWorkspace::new(&root,);

        let outcome = publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert_eq!(
            outcome,
            PublishOutcome::Merged {
                pull_request: PullRequestRef {
                    number:   17,
                    html_url: Some("https://github.com/acme/badge-deploy/pull/17".to_owned(),),
                },
                attempts:     1,
            }
        );

        let workspace_state = workspace.state();
        let svg = workspace_state.committed_badge.as_deref().expect("badge was not staged",);
        assert_eq!(crate::version::extract_published_version(svg).as_deref(), Some("1.4.0"));
        assert_eq!(workspace_state.commit_messages, ["Update badges: production - 1.4.0"]);
        assert_eq!(workspace_state.branches, ["payments-production-1.4.0"]);
        assert_eq!(workspace_state.identity, Some(CommitAuthor::default()));

        let host_state = host.state();
        assert_eq!(host_state.created.len(), 1);
        assert_eq!(host_state.created[0].head, "payments-production-1.4.0");
        assert_eq!(host_state.created[0].base, "main");
        assert_eq!(host_state.labels, ["badge"]);
        assert_eq!(host_state.milestones_set, [(17, 4)]);
        assert_eq!(host_state.deleted, ["payments-production-1.4.0"]);

        assert!(!workspace.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn merge_loop_stops_after_cap()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| state.merge_results = vec![false, false],);
        let workspace = FakeWorkspace::new(&root,);

        let outcome = publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert!(!outcome.is_success());
        assert!(matches!(outcome, PublishOutcome::MergeFailed { attempts: 10, .. }));
        assert_eq!(host.state().merge_calls, 10);
        assert_eq!(workspace.state().sync_calls, 10);
        assert!(host.state().deleted.is_empty());
        assert!(!workspace.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn merge_cap_follows_settings()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::default();
        let workspace = FakeWorkspace::new(&root,);
        let settings = Settings {
            merge_attempts: 3,
            ..Settings::default()
        };
        let capped = PublishRequest::new(inputs(), settings,).expect("valid request",);

        let outcome = publish(&host, &workspace, &capped,).await.expect("publish failed",);

        assert!(matches!(outcome, PublishOutcome::MergeFailed { attempts: 3, .. }));
        assert_eq!(host.state().merge_calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sync_counts_as_attempt()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| state.merge_results = vec![true],);
        let workspace = FakeWorkspace::new(&root,);
        workspace.state().sync_failures = 2;

        let outcome = publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert!(matches!(outcome, PublishOutcome::Merged { attempts: 3, .. }));
        assert_eq!(host.state().merge_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clone_failure_propagates_and_cleans_up()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::default();
        let workspace = FakeWorkspace::new(&root,);
        workspace.state().clone_failures = 5;

        let error = publish(&host, &workspace, &request(),).await.expect_err("expected failure",);

        match error {
            Error::RetryExhausted {
                operation,
                attempts,
                ..
            } => {
                assert_eq!(operation, "clone");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert_eq!(workspace.state().clone_calls, 2);
        assert!(!workspace.path().exists());
        assert!(host.state().created.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_pull_request_failures_are_retried()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| {
            state.create_failures = 4;
            state.merge_results = vec![true];
        },);
        let workspace = FakeWorkspace::new(&root,);

        let outcome = publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert!(outcome.is_success());
        assert_eq!(host.state().created.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn annotation_failures_do_not_abort()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| {
            state.labels_fail = true;
            state.milestone = None;
            state.merge_results = vec![true];
        },);
        let workspace = FakeWorkspace::new(&root,);

        let outcome = publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert!(outcome.is_success());
        assert!(host.state().milestones_set.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_is_treated_as_missing_badge()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| {
            state.fetch_fails = true;
            state.merge_results = vec![true];
        },);
        let workspace = FakeWorkspace::new(&root,);

        let outcome = publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert!(outcome.is_success());
        assert_eq!(workspace.state().clone_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_clone_directory_is_cleared_first()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| state.merge_results = vec![true],);
        let workspace = FakeWorkspace::new(&root,);
        fs::create_dir_all(workspace.path().join(".git",),).expect("failed to create stale clone",);
        fs::write(workspace.path().join("stale.txt",), "left over",).expect("write failed",);

        publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert!(!workspace.state().stale_at_clone);
        assert!(!workspace.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_directory_is_refused_and_kept()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let project = root.path().join("my-project",);
        fs::create_dir_all(project.join("src",),).expect("mkdir failed",);
        fs::write(project.join("src/important.rs",), "fn main() {}",).expect("write failed",);
        let host = FakeHost::default();
        let workspace = FakeWorkspace::at(project.clone(),);
        workspace.state().clone_failures = 5;

        let error = publish(&host, &workspace, &request(),).await.expect_err("expected refusal",);

        match error {
            Error::Workspace {
                path, ..
            } => assert_eq!(path, project),
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert_eq!(workspace.state().clone_calls, 0);
        assert!(project.join("src/important.rs").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_directory_is_used_as_clone_target()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| state.merge_results = vec![true],);
        let workspace = FakeWorkspace::new(&root,);
        fs::create_dir_all(workspace.path(),).expect("mkdir failed",);

        let outcome = publish(&host, &workspace, &request(),).await.expect("publish failed",);

        assert!(outcome.is_success());
        assert!(!workspace.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_clone_location_is_reported()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let blocker = root.path().join("blocker",);
        fs::write(&blocker, "not a directory",).expect("write failed",);
        let host = FakeHost::default();
        let workspace = FakeWorkspace::at(blocker.join("clone",),);

        let error = publish(&host, &workspace, &request(),).await.expect_err("expected failure",);

        assert!(matches!(error, Error::Workspace { .. }), "unexpected error: {error:?}");
        assert_eq!(workspace.state().clone_calls, 0);
        assert!(blocker.is_file());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_push_propagates_and_cleans_up()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::default();
        let workspace = FakeWorkspace::new(&root,);
        workspace.state().push_failures = 5;

        let error = publish(&host, &workspace, &request(),).await.expect_err("expected failure",);

        match error {
            Error::RetryExhausted {
                operation,
                attempts,
                ..
            } => {
                assert_eq!(operation, "push");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert_eq!(workspace.state().pushes, 2);
        assert!(host.state().created.is_empty());
        assert!(!workspace.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_pull_request_creation_cleans_up()
    {
        let root = tempdir().expect("failed to create tempdir",);
        let host = FakeHost::with(|state| state.create_failures = 5,);
        let workspace = FakeWorkspace::new(&root,);

        let error = publish(&host, &workspace, &request(),).await.expect_err("expected failure",);

        assert!(matches!(
            error,
            Error::RetryExhausted { ref operation, attempts: 5, .. } if operation == "create pull request"
        ));
        assert_eq!(host.state().merge_calls, 0);
        assert!(!workspace.path().exists());
    }

    #[tokio::test]
    async fn check_remote_propagates_fetch_errors()
    {
        let host = FakeHost::with(|state| state.fetch_fails = true,);
        assert!(check_remote(&host, &request()).await.is_err());
    }

    #[test]
    fn outcome_serializes_with_status_tag()
    {
        let outcome = PublishOutcome::MergeFailed {
            pull_request: PullRequestRef {
                number:   3,
                html_url: None,
            },
            attempts:     10,
        };
        let json = serde_json::to_value(&outcome,).expect("serialization failed",);
        assert_eq!(json["status"], "merge_failed");
        assert_eq!(json["pull_request"]["number"], 3);
        assert_eq!(json["attempts"], 10);
    }
}
