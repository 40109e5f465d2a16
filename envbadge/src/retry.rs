// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Bounded retry for flaky network calls.
///
/// Attempts are separated by a fixed delay. There is no backoff growth and no
/// jitter; the helper never sleeps after the final attempt.
use std::{fmt::Display, future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Error;

/// Attempt cap and fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct RetryPolicy
{
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay slept between two consecutive attempts.
    pub delay:        Duration,
}

impl RetryPolicy
{
    /// Policy used for cloning the target repository.
    pub const CLONE: Self = Self::new(2, Duration::from_millis(500,),);
    /// Policy used for pushing the pull request branch.
    pub const PUSH: Self = Self::new(2, Duration::from_millis(2000,),);
    /// Policy used for opening the pull request.
    pub const PULL_REQUEST: Self = Self::new(5, Duration::from_millis(2000,),);

    /// Creates a policy with the given attempt cap and delay.
    pub const fn new(max_attempts: u32, delay: Duration,) -> Self
    {
        Self {
            max_attempts,
            delay,
        }
    }

    fn attempts(&self,) -> u32
    {
        self.max_attempts.max(1,)
    }
}

/// Runs `f` until it succeeds or the policy's attempt cap is reached.
///
/// A cap of zero is treated as a single attempt.
///
/// # Arguments
///
/// * `policy` - Attempt cap and delay
/// * `operation_name` - Name of the operation for logging and the final error
/// * `f` - Async operation to retry
///
/// # Errors
///
/// Returns [`Error::RetryExhausted`] carrying the last failure's message when
/// every attempt failed.
///
/// # Example
///
/// ```no_run
/// use envbadge::retry::{RetryPolicy, retry_fixed};
///
/// # async fn example() -> Result<(), envbadge::Error> {
/// let value = retry_fixed(&RetryPolicy::PUSH, "git push", || async {
///     Ok::<_, envbadge::Error,>(42,)
/// },)
/// .await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub async fn retry_fixed<F, Fut, T, E,>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut f: F,
) -> Result<T, Error,>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E,>,>,
    E: Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(result,) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(result,);
            }
            Err(error,) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    "attempt failed: {error}"
                );

                if attempt >= max_attempts {
                    return Err(Error::RetryExhausted {
                        operation: operation_name.to_owned(),
                        attempts:  max_attempts,
                        last:      error.to_string(),
                    },);
                }

                sleep(policy.delay,).await;
                attempt += 1;
            }
        }
    }
}
