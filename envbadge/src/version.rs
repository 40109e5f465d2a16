// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Detection of the version embedded in a previously published badge.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static VERSION_TSPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<tspan[^>]*>\s*(\d+(?:\.\d+)*(?:[-+][0-9A-Za-z.+-]*)?)\s*</tspan>")
        .unwrap_or_else(|error| panic!("version pattern must compile: {error}"))
});

/// Returns the last version-looking `<tspan>` content found in `svg`.
///
/// Version-looking means dot-separated digits, optionally followed by a
/// pre-release or build suffix (`1.4.0-rc.1`, `2.0.0+build.7`). Whitespace
/// around the token is ignored.
///
/// # Example
///
/// ```
/// use envbadge::extract_published_version;
///
/// let svg = "<tspan x=\"14\">prod</tspan><tspan x=\"6\"> 1.2.3 </tspan>";
/// assert_eq!(extract_published_version(svg).as_deref(), Some("1.2.3"));
/// ```
pub fn extract_published_version(svg: &str) -> Option<String> {
    VERSION_TSPAN
        .captures_iter(svg)
        .last()
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_owned())
}

/// State of the remote badge relative to the version being published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VersionCheck {
    /// No badge has been published yet.
    Missing,
    /// The published badge already shows the requested version.
    Unchanged {
        /// Version found in the published badge.
        version: String
    },
    /// The published badge shows another version, or none could be found.
    Changed {
        /// Version found in the published badge, if any.
        previous: Option<String>
    }
}

impl VersionCheck {
    /// Compares the remote badge content against `version`.
    pub fn evaluate(remote: Option<&str>, version: &str) -> Self {
        let Some(content) = remote else {
            return Self::Missing;
        };

        match extract_published_version(content) {
            Some(previous) if previous == version => Self::Unchanged {
                version: previous
            },
            previous => Self::Changed {
                previous
            }
        }
    }

    /// Returns `true` when publishing would not change the remote badge.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged { .. })
    }

    /// Version currently published, if one was found.
    pub fn previous(&self) -> Option<&str> {
        match self {
            Self::Missing => None,
            Self::Unchanged {
                version
            } => Some(version),
            Self::Changed {
                previous
            } => previous.as_deref()
        }
    }
}
