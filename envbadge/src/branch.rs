// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Derivation of pull request branch names.
//!
//! Branch names produced here contain only ASCII alphanumerics, dots and
//! single hyphens, so they are valid git ref components regardless of what the
//! environment or version strings contain.

/// Builder for the branch that carries a badge update.
#[derive(Debug, Clone, Copy,)]
pub struct BranchName<'input,>
{
    repository:  &'input str,
    environment: &'input str,
    version:     &'input str,
}

impl<'input,> BranchName<'input,>
{
    /// Creates a builder for `{repository}-{environment}-{version}`.
    pub fn builder(repository: &'input str, environment: &'input str, version: &'input str,) -> Self
    {
        Self {
            repository,
            environment,
            version,
        }
    }

    /// Builds the normalized branch name.
    ///
    /// Returns `None` when nothing ref-worthy remains after normalization.
    ///
    /// # Examples
    ///
    /// ```
    /// use envbadge::BranchName;
    ///
    /// let branch = BranchName::builder("payments-api", "Prod EU", "1.4.0",).build();
    /// assert_eq!(branch.as_deref(), Some("payments-api-Prod-EU-1.4.0"));
    /// ```
    pub fn build(self,) -> Option<String,>
    {
        let raw = format!("{}-{}-{}", self.repository, self.environment, self.version);
        normalize_ref_component(&raw,)
    }
}

fn normalize_ref_component(source: &str,) -> Option<String,>
{
    let mut name = String::with_capacity(source.len(),);
    let mut pending_separator: Option<char,> = None;

    for candidate in source.trim().chars() {
        match candidate {
            'A'..='Z' | 'a'..='z' | '0'..='9' => {
                if let Some(separator,) = pending_separator.take()
                    && !name.is_empty()
                {
                    name.push(separator,);
                }
                name.push(candidate,);
            }
            '.' => {
                // A dot survives only between alphanumerics; `..` is not a valid ref.
                if pending_separator.is_none() {
                    pending_separator = Some('.',);
                }
            }
            _ => {
                pending_separator = Some('-',);
            }
        }
    }

    if name.is_empty() { None } else { Some(name,) }
}
