// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Local recovery email rules.
//!
//! Checks run in a fixed order and stop at the first failure:
//! - Format
//! - Same as the account email
//! - Already taken by another user
//! - Alias limit (`base+tag@domain` farming)
//! - Reserved platform domains
//! - Custom domain blacklist
//!
//! None of them call the verification API.

use crate::config::RulesConfig;
use crate::email::CandidateEmail;
use crate::error::StoreError;
use crate::store::{BlacklistOracle, UserStore, RECOVERY_EMAIL, UNVERIFIED_RECOVERY_EMAIL};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Why a candidate was refused. Messages are shown to the user as is.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("Invalid recovery email")]
    InvalidFormat,

    #[error("User email address cannot be saved as recovery email address")]
    SameAsAccountEmail,

    #[error("Recovery email address is already taken")]
    AlreadyTaken,

    #[error("This email address is invalid, please use another one")]
    AliasLimitExceeded,

    #[error("Email addresses on this platform's own domains cannot be used as recovery email address")]
    ReservedDomain,

    #[error("The domain of this email address is blacklisted. Please provide another recovery address")]
    BlacklistedDomain,

    #[error("The email address is disposable or not deliverable. Please provide another recovery address")]
    BlacklistedEmail,
}

impl Rejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::SameAsAccountEmail => "same_as_account_email",
            Self::AlreadyTaken => "already_taken",
            Self::AliasLimitExceeded => "alias_limit_exceeded",
            Self::ReservedDomain => "reserved_domain",
            Self::BlacklistedDomain => "blacklisted_domain",
            Self::BlacklistedEmail => "blacklisted_email",
        }
    }
}

/// Result of validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    /// Candidate is acceptable
    Valid,
    /// Candidate is refused
    Rejected(Rejection),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Rejected(r) => Some(*r),
        }
    }
}

/// Read-only snapshot of the user submitting a candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    #[serde(default)]
    pub current_email: Option<String>,
    #[serde(default)]
    pub current_recovery_email: Option<String>,
    #[serde(default)]
    pub current_unverified_recovery_email: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "en".to_string()
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            locale: default_locale(),
            ..Default::default()
        }
    }

    /// The user's current verified and unverified recovery emails, skipping unset ones.
    fn own_recovery_emails(&self) -> impl Iterator<Item = &str> {
        [
            self.current_recovery_email.as_deref(),
            self.current_unverified_recovery_email.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|e| !e.is_empty())
    }
}

/// Local rule checks.
pub struct RuleEngine {
    config: RulesConfig,
    users: Arc<dyn UserStore>,
    blacklist: Arc<dyn BlacklistOracle>,
}

impl RuleEngine {
    pub fn new(
        config: RulesConfig,
        users: Arc<dyn UserStore>,
        blacklist: Arc<dyn BlacklistOracle>,
    ) -> Self {
        Self {
            config,
            users,
            blacklist,
        }
    }

    /// Candidate must be a syntactically valid address.
    pub fn check_format(&self, candidate: &CandidateEmail) -> ValidationResult {
        if candidate.is_well_formed() {
            ValidationResult::Valid
        } else {
            ValidationResult::Rejected(Rejection::InvalidFormat)
        }
    }

    /// Candidate must differ from the account email, compared exactly as stored.
    pub fn check_self_match(&self, candidate: &CandidateEmail, ctx: &UserContext) -> ValidationResult {
        match ctx.current_email.as_deref() {
            Some(email) if !email.is_empty() && email == candidate.submitted() => {
                ValidationResult::Rejected(Rejection::SameAsAccountEmail)
            }
            _ => ValidationResult::Valid,
        }
    }

    /// Candidate must not be anyone's verified or unverified recovery email,
    /// unless it is the caller's own current value.
    pub async fn check_already_taken(
        &self,
        candidate: &CandidateEmail,
        ctx: &UserContext,
    ) -> Result<ValidationResult, StoreError> {
        if ctx.own_recovery_emails().any(|own| own == candidate.as_str()) {
            return Ok(ValidationResult::Valid);
        }

        for key in [RECOVERY_EMAIL, UNVERIFIED_RECOVERY_EMAIL] {
            let holders = self
                .users
                .find_users_by_attribute(key, candidate.as_str(), true)
                .await?;
            if !holders.is_empty() {
                debug!(attribute = key, holders = holders.len(), "Recovery email already held");
                return Ok(ValidationResult::Rejected(Rejection::AlreadyTaken));
            }
        }

        Ok(ValidationResult::Valid)
    }

    /// At most `alias_limit` other users may hold a verified `base+tag@domain`
    /// alias of the candidate's base address.
    pub async fn check_alias_limit(
        &self,
        candidate: &CandidateEmail,
        ctx: &UserContext,
    ) -> Result<ValidationResult, StoreError> {
        if !candidate.has_alias_tag() {
            return Ok(ValidationResult::Valid);
        }

        let parts = candidate.alias_parts();
        let editing_own_alias = ctx.own_recovery_emails().any(|own| {
            let own = CandidateEmail::new(own);
            own.alias_parts().same_base(&parts)
        });
        if editing_own_alias {
            return Ok(ValidationResult::Valid);
        }

        let Some(limit) = self.config.alias_limit() else {
            return Ok(ValidationResult::Valid);
        };

        let holders = self
            .users
            .find_users_by_alias(RECOVERY_EMAIL, parts.base, parts.domain)
            .await?;
        let others = holders.iter().filter(|u| **u != ctx.user_id).count();

        if others >= limit {
            debug!(base = parts.base, domain = parts.domain, others, limit, "Alias limit reached");
            return Ok(ValidationResult::Rejected(Rejection::AliasLimitExceeded));
        }

        Ok(ValidationResult::Valid)
    }

    /// Candidate must not live on the platform's own domains.
    pub fn check_reserved_domain(&self, candidate: &CandidateEmail) -> ValidationResult {
        let domain = candidate.domain();
        let reserved = [&self.config.legacy_domain, &self.config.main_domain]
            .into_iter()
            .any(|d| !d.is_empty() && d.eq_ignore_ascii_case(domain));

        if reserved {
            ValidationResult::Rejected(Rejection::ReservedDomain)
        } else {
            ValidationResult::Valid
        }
    }

    /// Candidate's domain must not be on the custom blacklist.
    pub async fn check_custom_blacklist(&self, candidate: &CandidateEmail) -> ValidationResult {
        if self.blacklist.is_custom_blacklisted(candidate.domain()).await {
            ValidationResult::Rejected(Rejection::BlacklistedDomain)
        } else {
            ValidationResult::Valid
        }
    }

    /// Run every local rule in order, stopping at the first rejection.
    ///
    /// The empty candidate (clearing the recovery email) is always valid.
    pub async fn check_local_rules(
        &self,
        candidate: &str,
        ctx: &UserContext,
    ) -> Result<ValidationResult, StoreError> {
        if candidate.is_empty() {
            return Ok(ValidationResult::Valid);
        }
        let candidate = CandidateEmail::new(candidate);

        let result = self.run_rules(&candidate, ctx).await?;
        match result {
            ValidationResult::Rejected(reason) => {
                info!(
                    user_id = %ctx.user_id,
                    code = reason.code(),
                    "Recovery email rejected by local rules"
                );
            }
            ValidationResult::Valid => {
                debug!(user_id = %ctx.user_id, "Recovery email passed local rules");
            }
        }
        Ok(result)
    }

    async fn run_rules(
        &self,
        candidate: &CandidateEmail,
        ctx: &UserContext,
    ) -> Result<ValidationResult, StoreError> {
        let result = self.check_format(candidate);
        if !result.is_valid() {
            return Ok(result);
        }

        let result = self.check_self_match(candidate, ctx);
        if !result.is_valid() {
            return Ok(result);
        }

        let result = self.check_already_taken(candidate, ctx).await?;
        if !result.is_valid() {
            return Ok(result);
        }

        let result = self.check_alias_limit(candidate, ctx).await?;
        if !result.is_valid() {
            return Ok(result);
        }

        let result = self.check_reserved_domain(candidate);
        if !result.is_valid() {
            return Ok(result);
        }

        Ok(self.check_custom_blacklist(candidate).await)
    }
}
