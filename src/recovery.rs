// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Recovery email lifecycle for a user.
//!
//! An accepted address is stored as *unverified* and replaces any verified
//! one. It becomes the verified recovery email once the user confirms it.

use crate::attempts::AttemptThrottle;
use crate::email::CandidateEmail;
use crate::error::{Result, StoreError};
use crate::pipeline::ValidationPipeline;
use crate::rules::{UserContext, ValidationResult};
use crate::store::{UserStore, ACCOUNT_EMAIL, LOCALE, RECOVERY_EMAIL, UNVERIFIED_RECOVERY_EMAIL};
use std::sync::Arc;
use tracing::info;

pub struct RecoveryEmailService {
    users: Arc<dyn UserStore>,
    pipeline: Arc<ValidationPipeline>,
    throttle: AttemptThrottle,
}

impl RecoveryEmailService {
    pub fn new(
        users: Arc<dyn UserStore>,
        pipeline: Arc<ValidationPipeline>,
        throttle: AttemptThrottle,
    ) -> Self {
        Self {
            users,
            pipeline,
            throttle,
        }
    }

    pub fn pipeline(&self) -> &Arc<ValidationPipeline> {
        &self.pipeline
    }

    pub fn throttle(&self) -> &AttemptThrottle {
        &self.throttle
    }

    /// Snapshot of the user's stored state for the pipeline.
    pub async fn user_context(&self, user_id: &str) -> std::result::Result<UserContext, StoreError> {
        let mut ctx = UserContext::new(user_id);
        ctx.current_email = self.non_empty(user_id, ACCOUNT_EMAIL).await?;
        ctx.current_recovery_email = self.non_empty(user_id, RECOVERY_EMAIL).await?;
        ctx.current_unverified_recovery_email =
            self.non_empty(user_id, UNVERIFIED_RECOVERY_EMAIL).await?;
        if let Some(locale) = self.non_empty(user_id, LOCALE).await? {
            ctx.locale = locale;
        }
        Ok(ctx)
    }

    pub async fn recovery_email(&self, user_id: &str) -> std::result::Result<Option<String>, StoreError> {
        self.non_empty(user_id, RECOVERY_EMAIL).await
    }

    pub async fn unverified_recovery_email(
        &self,
        user_id: &str,
    ) -> std::result::Result<Option<String>, StoreError> {
        self.non_empty(user_id, UNVERIFIED_RECOVERY_EMAIL).await
    }

    /// Validate `candidate` for `user_id` and store it if accepted.
    ///
    /// An empty candidate clears the recovery email and is never throttled.
    pub async fn submit(&self, user_id: &str, candidate: &str) -> Result<ValidationResult> {
        if candidate.is_empty() {
            self.users.delete_attribute(user_id, RECOVERY_EMAIL).await?;
            self.users.delete_attribute(user_id, UNVERIFIED_RECOVERY_EMAIL).await?;
            info!(%user_id, "Recovery email cleared");
            return Ok(ValidationResult::Valid);
        }

        self.throttle.record(user_id).await?;

        let ctx = self.user_context(user_id).await?;
        let result = self.pipeline.validate(candidate, &ctx).await?;
        if !result.is_valid() {
            return Ok(result);
        }

        let candidate = CandidateEmail::new(candidate);
        if ctx.current_recovery_email.as_deref() == Some(candidate.as_str()) {
            info!(%user_id, "Recovery email unchanged");
        } else {
            self.update_recovery_email(user_id, candidate.as_str()).await?;
        }
        Ok(result)
    }

    /// Store `email` as the pending recovery email and drop the verified one.
    pub async fn update_recovery_email(
        &self,
        user_id: &str,
        email: &str,
    ) -> std::result::Result<(), StoreError> {
        self.users
            .set_attribute(user_id, UNVERIFIED_RECOVERY_EMAIL, email)
            .await?;
        self.users.delete_attribute(user_id, RECOVERY_EMAIL).await?;
        info!(%user_id, "Recovery email awaiting verification");
        Ok(())
    }

    /// Promote the pending recovery email. Returns `false` when nothing was pending.
    pub async fn make_recovery_email_verified(
        &self,
        user_id: &str,
    ) -> std::result::Result<bool, StoreError> {
        let Some(pending) = self.unverified_recovery_email(user_id).await? else {
            return Ok(false);
        };
        self.users.set_attribute(user_id, RECOVERY_EMAIL, &pending).await?;
        self.users
            .delete_attribute(user_id, UNVERIFIED_RECOVERY_EMAIL)
            .await?;
        info!(%user_id, "Recovery email verified");
        Ok(true)
    }

    async fn non_empty(
        &self,
        user_id: &str,
        key: &str,
    ) -> std::result::Result<Option<String>, StoreError> {
        Ok(self
            .users
            .get_attribute(user_id, key)
            .await?
            .filter(|v| !v.is_empty()))
    }
}
