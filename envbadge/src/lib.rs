// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Environment/version badge rendering and publication.
//!
//! The library renders two-segment SVG badges, reads the version embedded in
//! a previously published badge, and publishes updated badges to a target
//! repository through a pull request that is merged with branch protection
//! bypassed. Git and GitHub access sit behind the [`Workspace`] and
//! [`PullRequestHost`] traits so the pipeline can run against any
//! implementation.

mod badge;
mod branch;
mod config;
mod error;
mod git;
mod github;
mod publish;
pub mod retry;
mod version;

pub use badge::{
    BADGE_HEIGHT, BadgeLayout, DejaVuSans, FONT_FAMILY, FONT_SIZE, PALETTE, Palette,
    RenderedBadge, TextMeasure, render_badge, render_badge_with, write_badge,
};
pub use branch::BranchName;
pub use config::{
    CommitAuthor, DEFAULT_BADGE_DIR, DEFAULT_HOST, DEFAULT_LABEL, DEFAULT_MERGE_ATTEMPTS,
    DEFAULT_MILESTONE, PublishInputs, PublishRequest, RepoSlug, Settings,
};
pub use error::{Error, badge_io_error, settings_io_error};
pub use git::{GitCli, Workspace};
pub use github::{GitHubClient, PullRequestDraft, PullRequestHost, PullRequestRef};
pub use publish::{PublishOutcome, check_remote, publish};
pub use version::{VersionCheck, extract_published_version};
