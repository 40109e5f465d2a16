#![allow(non_shorthand_field_patterns)]
#![doc = "Failure modes of badge rendering and publication."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Patterns generated by the [`masterror::Error`] derive trip the
//! `non_shorthand_field_patterns` lint, hence the module-level allow.

use std::path::{Path, PathBuf};

/// Every failure the library and the binary can report.
///
/// Messages coming from git never contain the access token; [`GitCli`]
/// redacts it before the error is built.
///
/// [`GitCli`]: crate::GitCli
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// The settings file could not be read.
    #[error("failed to read settings from {path:?}: {source}")]
    SettingsIo {
        /// Settings file location.
        path:   PathBuf,
        /// Operating system error.
        source: std::io::Error
    },
    /// The settings file is not valid YAML for [`Settings`](crate::Settings).
    #[error("failed to parse settings: {source}")]
    Parse {
        /// Error reported by serde_yaml.
        source: serde_yaml::Error
    },
    /// An input or setting is outside its accepted range.
    #[error("invalid configuration: {message}")]
    Validation {
        /// What was rejected and why.
        message: String
    },
    /// A JSON report could not be produced.
    #[error("failed to serialize report: {source}")]
    Serialize {
        /// Error reported by serde_json.
        source: serde_json::Error
    },
    /// The badge file could not be written.
    #[error("failed to write badge at {path:?}: {source}")]
    BadgeIo {
        /// Badge location.
        path:   PathBuf,
        /// Operating system error.
        source: std::io::Error
    },
    /// The clone directory could not be prepared.
    #[error("failed to prepare clone directory {path:?}: {source}")]
    Workspace {
        /// Clone directory.
        path:   PathBuf,
        /// Operating system error.
        source: std::io::Error
    },
    /// A git command failed or could not be spawned.
    #[error("git error: {message}")]
    Git {
        /// Command and its redacted stderr.
        message: String
    },
    /// A GitHub REST call failed.
    #[error("GitHub API error: {message}")]
    GitHub {
        /// Endpoint context and the client's error.
        message: String
    },
    /// Every attempt of a retried operation failed.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Operation name.
        operation: String,
        /// Attempts performed.
        attempts:  u32,
        /// Display string of the last failure.
        last:      String
    },
    /// The pull request stayed open after the merge attempts ran out.
    #[error("pull request #{number} could not be merged after {attempts} attempts")]
    Unmerged {
        /// Pull request number.
        number:   u64,
        /// Merge attempts performed.
        attempts: u32
    },
    /// Command output could not be written.
    #[error("failed to write output: {source}")]
    Output {
        /// Operating system error.
        source: std::io::Error
    }
}

impl Error {
    /// Builds an [`Error::Validation`].
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Builds an [`Error::Git`].
    pub fn git<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Git {
            message: message.into()
        }
    }

    /// Builds an [`Error::GitHub`].
    pub fn github<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::GitHub {
            message: message.into()
        }
    }

    /// Display string printed by the binary before exiting.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Wraps a settings read failure together with the file location.
pub fn settings_io_error(path: &Path, source: std::io::Error) -> Error {
    Error::SettingsIo {
        path: path.to_path_buf(),
        source
    }
}

/// Wraps a badge write failure together with the failing location.
pub fn badge_io_error(path: &Path, source: std::io::Error) -> Error {
    Error::BadgeIo {
        path: path.to_path_buf(),
        source
    }
}
