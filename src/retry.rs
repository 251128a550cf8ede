// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Exponential backoff around verification API calls.
//!
//! Only a rate-limit answer is retried. Any other failure propagates on
//! first occurrence.

use crate::config::VerificationConfig;
use crate::error::{ApiError, VerifyError};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Retry limits for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed while the API keeps answering 429
    pub max_retries: u32,
    /// Pause before the first retry
    pub initial_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_interval: Duration::from_millis(1000),
        }
    }
}

impl From<&VerificationConfig> for RetryPolicy {
    fn from(config: &VerificationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_interval: config.initial_interval(),
        }
    }
}

/// Progress of one retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Rate-limited attempts so far
    pub attempt: u32,
    /// Pause before the next attempt
    pub interval: Duration,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            interval: policy.initial_interval,
        }
    }

    fn backoff(&mut self) {
        self.interval = self.interval.saturating_mul(2);
    }
}

/// Run `action` until it succeeds, fails permanently, or the retry budget is spent.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut action: F,
) -> Result<T, VerifyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut state = RetryState::new(policy);

    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                state.attempt += 1;
                if state.attempt >= policy.max_retries {
                    warn!(operation, attempts = state.attempt, "Verification API rate limit persisted, giving up");
                    return Err(VerifyError::RetryBudgetExhausted {
                        attempts: state.attempt,
                    });
                }

                warn!(
                    operation,
                    attempt = state.attempt,
                    wait_ms = state.interval.as_millis() as u64,
                    "Rate limited (429), waiting before retry"
                );
                tokio::time::sleep(state.interval).await;
                state.backoff();
            }
            Err(err) => {
                error!(operation, error = %err, "Verification API call failed");
                return Err(VerifyError::Api(err));
            }
        }
    }
}
