// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-user submission throttle.
//!
//! Coarser than the verification limiter: bounds how often one user may
//! submit a new recovery email (3 per hour by default).

use crate::config::AttemptConfig;
use crate::error::GuardError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;

pub struct AttemptThrottle {
    config: AttemptConfig,
    attempts: RwLock<HashMap<String, Vec<Instant>>>,
}

impl AttemptThrottle {
    pub fn new(config: AttemptConfig) -> Self {
        Self {
            config,
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Record an attempt for `user_id`, or fail if the user is at the limit.
    pub async fn record(&self, user_id: &str) -> Result<(), GuardError> {
        let window = self.config.window_duration();
        let now = Instant::now();

        let mut attempts = self.attempts.write().await;
        let user_attempts = attempts.entry(user_id.to_string()).or_default();
        user_attempts.retain(|t| now.duration_since(*t) < window);

        if user_attempts.len() >= self.config.max_attempts as usize {
            let retry_after = user_attempts
                .first()
                .map(|oldest| (*oldest + window).saturating_duration_since(now))
                .unwrap_or(window);
            info!(%user_id, attempts = user_attempts.len(), "User exceeded the maximum number of verification attempts");
            return Err(GuardError::TooManyAttempts { retry_after });
        }

        user_attempts.push(now);
        Ok(())
    }

    /// Attempts currently counted against `user_id`.
    pub async fn count(&self, user_id: &str) -> usize {
        let window = self.config.window_duration();
        let now = Instant::now();
        self.attempts
            .read()
            .await
            .get(user_id)
            .map(|a| a.iter().filter(|t| now.duration_since(**t) < window).count())
            .unwrap_or(0)
    }

    /// Drop users with no attempts left in the window (should be called periodically).
    pub async fn cleanup(&self) {
        let window = self.config.window_duration();
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, times| {
            times.retain(|t| now.duration_since(*t) < window);
            !times.is_empty()
        });
    }
}
