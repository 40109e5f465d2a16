// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// GitHub REST calls used by the publish pipeline.
///
/// Requests go through [`Octocrab`]'s raw verbs with small local response
/// types, so only the fields the pipeline reads have to be present.
use base64::Engine as _;
use octocrab::{Octocrab, params::repos::Reference};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::{config::RepoSlug, error::Error};

/// Pull request opened for a badge update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct PullRequestRef
{
    /// Pull request number.
    pub number:   u64,
    /// Browser URL, when reported by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String,>,
}

/// Parameters of a pull request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct PullRequestDraft
{
    /// Title.
    pub title: String,
    /// Branch holding the changes.
    pub head:  String,
    /// Branch the changes merge into.
    pub base:  String,
    /// Description.
    pub body:  String,
}

/// Hosted repository operations the publish pipeline depends on.
#[allow(async_fn_in_trait)]
pub trait PullRequestHost
{
    /// Returns the text of `path` at `reference`, or `None` when it does not
    /// exist.
    async fn fetch_file(&self, path: &str, reference: &str,) -> Result<Option<String,>, Error,>;

    /// Opens a pull request.
    async fn create_pull_request(&self, draft: &PullRequestDraft,)
    -> Result<PullRequestRef, Error,>;

    /// Adds labels to a pull request.
    async fn add_labels(&self, number: u64, labels: &[String],) -> Result<(), Error,>;

    /// Looks up an open milestone by title.
    async fn find_milestone(&self, title: &str,) -> Result<Option<u64,>, Error,>;

    /// Assigns a milestone to a pull request.
    async fn set_milestone(&self, number: u64, milestone: u64,) -> Result<(), Error,>;

    /// Merges a pull request bypassing branch protection; returns whether the
    /// API reported the pull request as merged.
    async fn merge(&self, number: u64,) -> Result<bool, Error,>;

    /// Deletes a branch on the remote.
    async fn delete_branch(&self, branch: &str,) -> Result<(), Error,>;
}

#[derive(Debug, Deserialize,)]
struct RemoteContent
{
    #[serde(default)]
    content:  Option<String,>,
    #[serde(default)]
    encoding: Option<String,>,
}

#[derive(Debug, Deserialize,)]
struct MilestoneSummary
{
    number: u64,
    title:  String,
}

#[derive(Debug, Deserialize,)]
struct MergeResponse
{
    #[serde(default)]
    merged:  bool,
    #[serde(default)]
    message: Option<String,>,
}

/// [`PullRequestHost`] backed by the GitHub REST API.
#[derive(Clone,)]
pub struct GitHubClient
{
    client: Octocrab,
    repo:   RepoSlug,
}

impl std::fmt::Debug for GitHubClient
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("GitHubClient",).field("repo", &self.repo,).finish_non_exhaustive()
    }
}

impl GitHubClient
{
    /// Creates a client for `repo` authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GitHub`] when the HTTP client cannot be built.
    pub fn new(token: &str, repo: RepoSlug,) -> Result<Self, Error,>
    {
        let client = Octocrab::builder()
            .personal_token(token.to_owned(),)
            .build()
            .map_err(|e| Error::github(format!("failed to initialize GitHub client: {e}"),),)?;

        Ok(Self {
            client,
            repo,
        },)
    }

    /// Creates a client that talks to `base_uri` instead of `api.github.com`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GitHub`] when the URI is invalid or the HTTP client
    /// cannot be built.
    pub fn with_base_uri(token: &str, repo: RepoSlug, base_uri: &str,) -> Result<Self, Error,>
    {
        let client = Octocrab::builder()
            .base_uri(base_uri,)
            .map_err(|e| Error::github(format!("invalid GitHub API URI {base_uri}: {e}"),),)?
            .personal_token(token.to_owned(),)
            .build()
            .map_err(|e| Error::github(format!("failed to initialize GitHub client: {e}"),),)?;

        Ok(Self {
            client,
            repo,
        },)
    }

    fn route(&self, suffix: &str,) -> String
    {
        format!("/repos/{}/{}/{suffix}", self.repo.owner, self.repo.name)
    }
}

impl PullRequestHost for GitHubClient
{
    async fn fetch_file(&self, path: &str, reference: &str,) -> Result<Option<String,>, Error,>
    {
        let route = self.route(&format!("contents/{}", encode_path(path)),);
        debug!(repo = %self.repo, path, reference, "fetching published file");

        let result: Result<RemoteContent, octocrab::Error,> =
            self.client.get(route, Some(&[("ref", reference,),],),).await;

        match result {
            Ok(file,) => decode_content(&file,).map(Some,),
            Err(octocrab::Error::GitHub {
                source, ..
            },) if source.status_code.as_u16() == 404 => Ok(None,),
            Err(e,) => Err(Error::github(format!("failed to fetch {path}@{reference}: {e}"),),),
        }
    }

    async fn create_pull_request(&self, draft: &PullRequestDraft,)
    -> Result<PullRequestRef, Error,>
    {
        self.client
            .post(self.route("pulls",), Some(draft,),)
            .await
            .map_err(|e| Error::github(format!("failed to create pull request: {e}"),),)
    }

    async fn add_labels(&self, number: u64, labels: &[String],) -> Result<(), Error,>
    {
        let _: serde_json::Value = self
            .client
            .post(self.route(&format!("issues/{number}/labels"),), Some(&json!({ "labels": labels })),)
            .await
            .map_err(|e| Error::github(format!("failed to label pull request #{number}: {e}"),),)?;
        Ok((),)
    }

    async fn find_milestone(&self, title: &str,) -> Result<Option<u64,>, Error,>
    {
        let milestones: Vec<MilestoneSummary,> = self
            .client
            .get(self.route("milestones",), Some(&[("state", "open",), ("per_page", "100",),],),)
            .await
            .map_err(|e| Error::github(format!("failed to list milestones: {e}"),),)?;

        Ok(milestones.into_iter().find(|milestone| milestone.title == title,).map(|m| m.number,),)
    }

    async fn set_milestone(&self, number: u64, milestone: u64,) -> Result<(), Error,>
    {
        let _: serde_json::Value = self
            .client
            .patch(self.route(&format!("issues/{number}"),), Some(&json!({ "milestone": milestone })),)
            .await
            .map_err(|e| {
                Error::github(format!("failed to set milestone on pull request #{number}: {e}"),)
            },)?;
        Ok((),)
    }

    async fn merge(&self, number: u64,) -> Result<bool, Error,>
    {
        let body = json!({ "merge_method": "merge", "bypass_rules": true });
        let response: MergeResponse = self
            .client
            .put(self.route(&format!("pulls/{number}/merge"),), Some(&body,),)
            .await
            .map_err(|e| Error::github(format!("failed to merge pull request #{number}: {e}"),),)?;

        debug!(number, merged = response.merged, message = ?response.message, "merge response");
        Ok(response.merged,)
    }

    async fn delete_branch(&self, branch: &str,) -> Result<(), Error,>
    {
        self.client
            .repos(&self.repo.owner, &self.repo.name,)
            .delete_ref(&Reference::Branch(branch.to_owned(),),)
            .await
            .map_err(|e| Error::github(format!("failed to delete branch {branch}: {e}"),),)
    }
}

fn decode_content(file: &RemoteContent,) -> Result<String, Error,>
{
    let Some(content,) = file.content.as_deref() else {
        return Ok(String::new(),);
    };

    match file.encoding.as_deref() {
        Some("base64",) | None => {
            let compact: String = content.chars().filter(|ch| !ch.is_ascii_whitespace(),).collect();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(compact,)
                .map_err(|e| Error::github(format!("published file is not valid base64: {e}"),),)?;
            Ok(String::from_utf8_lossy(&bytes,).into_owned(),)
        }
        Some(other,) => Err(Error::github(format!("unsupported content encoding '{other}'"),),),
    }
}

fn encode_path(path: &str,) -> String
{
    let mut encoded = String::with_capacity(path.len(),);
    for byte in path.trim_start_matches('/',).bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char,)
            }
            other => encoded.push_str(&format!("%{other:02X}"),),
        }
    }
    encoded
}
