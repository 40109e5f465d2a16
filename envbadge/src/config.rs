// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Settings and validated inputs for a badge publication.
//!
//! [`Settings`] mirrors the optional YAML document that tunes labels, commit
//! identity and the merge cap. [`PublishRequest`] combines those settings
//! with the per-run inputs (environment, version, repositories) after
//! validation, and derives every path, branch and message the pipeline uses.

use std::{fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    branch::BranchName,
    error::{self, Error},
};

/// Default label attached to badge pull requests.
pub const DEFAULT_LABEL: &str = "badge";
/// Default milestone assigned to badge pull requests.
pub const DEFAULT_MILESTONE: &str = "Badges";
/// Default directory, inside the target repository, holding badges.
pub const DEFAULT_BADGE_DIR: &str = "badges";
/// Default git host used for clone and push URLs.
pub const DEFAULT_HOST: &str = "github.com";
/// Default cap on rebase-and-merge attempts.
pub const DEFAULT_MERGE_ATTEMPTS: u32 = 10;

/// `owner/name` identifier of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize,)]
pub struct RepoSlug
{
    /// Account that owns the repository.
    pub owner: String,
    /// Repository name.
    pub name:  String,
}

impl RepoSlug
{
    /// Creates a slug from its parts without validation.
    pub fn new(owner: impl Into<String,>, name: impl Into<String,>,) -> Self
    {
        Self {
            owner: owner.into(),
            name:  name.into(),
        }
    }
}

impl FromStr for RepoSlug
{
    type Err = Error;

    fn from_str(value: &str,) -> Result<Self, Self::Err,>
    {
        let trimmed = value.trim().trim_end_matches(".git",);
        let mut parts = trimmed.split('/',);

        match (parts.next(), parts.next(), parts.next(),) {
            (Some(owner,), Some(name,), None,) if is_name_segment(owner,) && is_name_segment(name,) => {
                Ok(Self::new(owner, name,),)
            }
            _ => Err(Error::validation(format!(
                "repository '{value}' must use the owner/name format"
            ),),),
        }
    }
}

impl fmt::Display for RepoSlug
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn is_name_segment(segment: &str,) -> bool
{
    !segment.is_empty()
        && segment.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'),)
}

/// Commit identity configured in the clone before committing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
pub struct CommitAuthor
{
    /// Value for `user.name`.
    #[serde(default = "default_author_name")]
    pub name:  String,
    /// Value for `user.email`.
    #[serde(default = "default_author_email")]
    pub email: String,
}

impl Default for CommitAuthor
{
    fn default() -> Self
    {
        Self {
            name:  default_author_name(),
            email: default_author_email(),
        }
    }
}

fn default_author_name() -> String
{
    "Badge Action".to_owned()
}

fn default_author_email() -> String
{
    "badge@action.com".to_owned()
}

/// Optional YAML settings document.
///
/// # Examples
///
/// ```
/// use envbadge::Settings;
///
/// let yaml = r#"
/// label: release-badge
/// merge-attempts: 4
/// author:
///   name: Release Bot
/// "#;
/// let settings: Settings = serde_yaml::from_str(yaml,).expect("valid settings",);
/// assert_eq!(settings.label, "release-badge");
/// assert_eq!(settings.merge_attempts, 4);
/// assert_eq!(settings.milestone.as_deref(), Some("Badges"));
/// assert_eq!(settings.author.email, "badge@action.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(deny_unknown_fields)]
pub struct Settings
{
    /// Label added to the pull request.
    #[serde(default = "default_label")]
    pub label: String,

    /// Milestone title assigned to the pull request; `null` disables it.
    #[serde(default = "default_milestone")]
    pub milestone: Option<String,>,

    /// Directory inside the target repository that holds badges.
    #[serde(default = "default_badge_dir", alias = "badge-dir", alias = "badgeDir")]
    pub badge_dir: String,

    /// Git host used to build authenticated clone URLs.
    #[serde(default = "default_host")]
    pub host: String,

    /// Cap on rebase-and-merge attempts.
    #[serde(default = "default_merge_attempts", alias = "merge-attempts", alias = "mergeAttempts")]
    pub merge_attempts: u32,

    /// Commit identity.
    #[serde(default)]
    pub author: CommitAuthor,
}

impl Default for Settings
{
    fn default() -> Self
    {
        Self {
            label:          default_label(),
            milestone:      default_milestone(),
            badge_dir:      default_badge_dir(),
            host:           default_host(),
            merge_attempts: default_merge_attempts(),
            author:         CommitAuthor::default(),
        }
    }
}

fn default_label() -> String
{
    DEFAULT_LABEL.to_owned()
}

fn default_milestone() -> Option<String,>
{
    Some(DEFAULT_MILESTONE.to_owned(),)
}

fn default_badge_dir() -> String
{
    DEFAULT_BADGE_DIR.to_owned()
}

fn default_host() -> String
{
    DEFAULT_HOST.to_owned()
}

fn default_merge_attempts() -> u32
{
    DEFAULT_MERGE_ATTEMPTS
}

impl Settings
{
    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SettingsIo`] when the file cannot be read, [`Error::Parse`]
    /// for malformed YAML and [`Error::Validation`] when a value is out of
    /// range.
    pub fn load(path: &Path,) -> Result<Self, Error,>
    {
        let contents = fs::read_to_string(path,).map_err(|source| error::settings_io_error(path, source,),)?;
        Self::parse(&contents,)
    }

    /// Parses settings from a YAML string. An empty document yields defaults.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn parse(contents: &str,) -> Result<Self, Error,>
    {
        if contents.trim().is_empty() {
            return Ok(Self::default(),);
        }

        let settings: Self = serde_yaml::from_str(contents,)?;
        settings.validate()?;
        Ok(settings,)
    }

    fn validate(&self,) -> Result<(), Error,>
    {
        if self.merge_attempts == 0 {
            return Err(Error::validation("merge-attempts must be at least 1",),);
        }
        if self.label.trim().is_empty() {
            return Err(Error::validation("label must not be empty",),);
        }
        if self.host.trim().is_empty() || self.host.contains('/',) {
            return Err(Error::validation(format!("host '{}' is not a bare host name", self.host),),);
        }
        let badge_dir = self.badge_dir.trim_matches('/',);
        if badge_dir.is_empty() || badge_dir.split('/',).any(|segment| segment == "..",) {
            return Err(Error::validation(format!(
                "badge directory '{}' must be a relative path inside the repository",
                self.badge_dir
            ),),);
        }
        Ok((),)
    }
}

/// Raw per-run inputs, usually collected from the command line.
#[derive(Debug, Clone, Default,)]
pub struct PublishInputs
{
    /// Environment name shown in the left segment.
    pub environment: String,
    /// Version shown in the right segment.
    pub version:     String,
    /// Token used for the API and for authenticated git URLs.
    pub token:       String,
    /// Base branch of the target repository.
    pub branch:      String,
    /// Repository receiving the badge, as `owner/name`.
    pub target:      String,
    /// Repository the badge describes, as `owner/name`.
    pub source:      String,
}

/// Validated publication request.
#[derive(Clone,)]
pub struct PublishRequest
{
    environment: String,
    version:     String,
    token:       String,
    branch:      String,
    target:      RepoSlug,
    source:      RepoSlug,
    pr_branch:   String,
    settings:    Settings,
}

impl fmt::Debug for PublishRequest
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.debug_struct("PublishRequest",)
            .field("environment", &self.environment,)
            .field("version", &self.version,)
            .field("branch", &self.branch,)
            .field("target", &self.target,)
            .field("source", &self.source,)
            .field("settings", &self.settings,)
            .finish_non_exhaustive()
    }
}

impl PublishRequest
{
    /// Validates `inputs` against `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a required input is empty, a
    /// repository is not in `owner/name` form, the environment cannot be used
    /// as a file name, or no branch name can be derived.
    pub fn new(inputs: PublishInputs, settings: Settings,) -> Result<Self, Error,>
    {
        let environment = required("environment", &inputs.environment,)?;
        let version = required("version", &inputs.version,)?;
        let token = required("token", &inputs.token,)?;
        let branch = required("branch", &inputs.branch,)?;

        if environment.contains(['/', '\\',],) || environment == "." || environment == ".." {
            return Err(Error::validation(format!(
                "environment '{environment}' cannot be used as a file name"
            ),),);
        }

        settings.validate()?;

        let target = inputs.target.parse()?;
        let source: RepoSlug = inputs.source.parse()?;
        let pr_branch = BranchName::builder(&source.name, &environment, &version,)
            .build()
            .ok_or_else(|| Error::validation("no valid branch name can be derived from the inputs",),)?;

        Ok(Self {
            environment,
            version,
            token,
            branch,
            target,
            source,
            pr_branch,
            settings,
        },)
    }

    /// Environment shown in the left segment.
    pub fn environment(&self,) -> &str
    {
        &self.environment
    }

    /// Version shown in the right segment.
    pub fn version(&self,) -> &str
    {
        &self.version
    }

    /// Access token.
    pub fn token(&self,) -> &str
    {
        &self.token
    }

    /// Base branch of the target repository.
    pub fn base_branch(&self,) -> &str
    {
        &self.branch
    }

    /// Repository receiving the badge.
    pub fn target(&self,) -> &RepoSlug
    {
        &self.target
    }

    /// Effective settings.
    pub fn settings(&self,) -> &Settings
    {
        &self.settings
    }

    /// Path of the badge inside the target repository.
    pub fn badge_path(&self,) -> String
    {
        format!(
            "{}/{}/{}.svg",
            self.settings.badge_dir.trim_matches('/'),
            self.source.name,
            self.environment
        )
    }

    /// Branch carrying the badge update.
    pub fn pr_branch(&self,) -> String
    {
        self.pr_branch.clone()
    }

    /// Commit message and pull request title.
    pub fn commit_message(&self,) -> String
    {
        format!("Update badges: {} - {}", self.environment, self.version)
    }

    /// Pull request description.
    pub fn pr_body(&self,) -> String
    {
        format!(
            "This pull request updates the `{}` badge of {} to version {}.",
            self.environment, self.source, self.version
        )
    }

    /// Authenticated HTTPS URL of the target repository.
    pub fn remote_url(&self,) -> String
    {
        format!(
            "https://x-access-token:{}@{}/{}/{}.git",
            self.token, self.settings.host, self.target.owner, self.target.name
        )
    }
}

fn required(name: &str, value: &str,) -> Result<String, Error,>
{
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{name} must be provided"),),);
    }
    Ok(trimmed.to_owned(),)
}
