// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Recovery email validation pipeline.
//!
//! Local rules first, then the verification API behind the sliding window
//! limiter. Popular domains skip the domain-level check but every non-empty
//! candidate gets an email-level check.
//!
//! The pipeline only decides. Storing the result is the caller's job.

use crate::config::{Config, RateLimitConfig};
use crate::email::CandidateEmail;
use crate::error::{GuardError, Result, VerifyError};
use crate::limiter::{Admission, SlidingWindowLimiter};
use crate::metrics::Metrics;
use crate::retry::RetryPolicy;
use crate::rules::{Rejection, RuleEngine, UserContext, ValidationResult};
use crate::store::{BlacklistOracle, UserStore};
use crate::verify::{VerificationApi, VerificationClient, Verdict};
use std::sync::Arc;
use tracing::{info, warn};

/// Limiter key for email-level API calls.
pub const EMAIL_CHECK_KEY: &str = "email-check";
/// Limiter key for domain-level API calls.
pub const DOMAIN_CHECK_KEY: &str = "domain-check";

pub struct ValidationPipeline {
    rules: RuleEngine,
    blacklist: Arc<dyn BlacklistOracle>,
    limiter: Arc<SlidingWindowLimiter>,
    verifier: VerificationClient,
    rate_limit: RateLimitConfig,
    metrics: Arc<Metrics>,
}

impl ValidationPipeline {
    pub fn new(
        config: &Config,
        users: Arc<dyn UserStore>,
        blacklist: Arc<dyn BlacklistOracle>,
        api: Arc<dyn VerificationApi>,
        limiter: Arc<SlidingWindowLimiter>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            rules: RuleEngine::new(config.rules.clone(), users, blacklist.clone()),
            blacklist,
            limiter,
            verifier: VerificationClient::new(api, RetryPolicy::from(&config.verification)),
            rate_limit: config.rate_limit.clone(),
            metrics,
        }
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Decide whether `candidate` may become the user's recovery email.
    pub async fn validate(&self, candidate: &str, ctx: &UserContext) -> Result<ValidationResult> {
        let outcome = self.run(candidate, ctx).await;

        let label = match &outcome {
            Ok(ValidationResult::Valid) => "valid",
            Ok(ValidationResult::Rejected(reason)) => reason.code(),
            Err(GuardError::RateLimited { .. }) => "rate_limited",
            Err(GuardError::VerificationUnavailable(_)) => "verification_unavailable",
            Err(GuardError::TooManyAttempts { .. }) => "too_many_attempts",
            Err(GuardError::Store(_)) => "store_error",
        };
        self.metrics.validations.with_label_values(&[label]).inc();

        outcome
    }

    async fn run(&self, candidate: &str, ctx: &UserContext) -> Result<ValidationResult> {
        if candidate.is_empty() {
            return Ok(ValidationResult::Valid);
        }

        let local = self.rules.check_local_rules(candidate, ctx).await?;
        if !local.is_valid() {
            return Ok(local);
        }

        let email = CandidateEmail::new(candidate);
        let domain = email.domain();

        if self.blacklist.is_popular_domain(domain).await {
            info!(user_id = %ctx.user_id, %domain, "Popular domain, skipping domain verification");
        } else {
            self.admit(DOMAIN_CHECK_KEY, self.rate_limit.domain_check_rate).await?;
            let verdict = self.verified("domain", self.verifier.check_domain(domain).await)?;
            match verdict {
                Verdict::Allowed => {}
                Verdict::Disposable { related_domains }
                | Verdict::NoMailExchanger { related_domains } => {
                    info!(user_id = %ctx.user_id, %domain, "Recovery email domain is disposable or has no MX");
                    self.blacklist.add_disposable_domain(domain, &related_domains).await;
                    return Ok(ValidationResult::Rejected(Rejection::BlacklistedEmail));
                }
                Verdict::Undeliverable => {
                    return Ok(ValidationResult::Rejected(Rejection::BlacklistedEmail));
                }
            }
        }

        self.admit(EMAIL_CHECK_KEY, self.rate_limit.email_check_rate).await?;
        let verdict = self.verified("email", self.verifier.check_email(email.as_str()).await)?;
        match verdict {
            Verdict::Allowed => {
                info!(user_id = %ctx.user_id, "Recovery email verified");
                Ok(ValidationResult::Valid)
            }
            other => {
                info!(user_id = %ctx.user_id, verdict = ?other, "Recovery email is disposable or not deliverable");
                Ok(ValidationResult::Rejected(Rejection::BlacklistedEmail))
            }
        }
    }

    async fn admit(&self, key: &str, rate_limit: u32) -> Result<()> {
        let admission = self
            .limiter
            .admit(key, rate_limit, self.rate_limit.max_wait_attempts)
            .await;

        let outcome = if admission.is_admitted() { "admitted" } else { "exceeded" };
        self.metrics.admissions.with_label_values(&[key, outcome]).inc();

        match admission {
            Admission::Admitted { .. } => Ok(()),
            Admission::Exceeded { waits } => {
                warn!(key, waits, "Verification rate limit exceeded");
                Err(GuardError::RateLimited {
                    key: key.to_string(),
                })
            }
        }
    }

    fn verified(
        &self,
        check: &str,
        result: std::result::Result<Verdict, VerifyError>,
    ) -> Result<Verdict> {
        let outcome = match &result {
            Ok(Verdict::Allowed) => "allowed",
            Ok(Verdict::Disposable { .. }) => "disposable",
            Ok(Verdict::Undeliverable) => "undeliverable",
            Ok(Verdict::NoMailExchanger { .. }) => "no_mx",
            Err(VerifyError::RetryBudgetExhausted { .. }) => "retry_exhausted",
            Err(VerifyError::Api(_)) => "failed",
        };
        self.metrics
            .verification_calls
            .with_label_values(&[check, outcome])
            .inc();

        Ok(result?)
    }
}
