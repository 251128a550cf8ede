// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the recovery email guard.
//!
//! Rejections of a candidate address are not errors; they travel as
//! [`crate::rules::ValidationResult::Rejected`]. The types here cover
//! infrastructure failures and misconfiguration.

use std::time::Duration;
use thiserror::Error;

/// Configuration errors. All of these abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration key: {0}")]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid verification API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure reported by a user attribute store.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("User store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a single verification API call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The API answered 429. The only failure worth retrying.
    #[error("Verification API rate limit hit")]
    RateLimited,

    #[error("Verification API returned status {0}")]
    Status(u16),

    #[error("Verification API request failed: {0}")]
    Transport(String),

    #[error("Malformed verification API response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether the call may succeed if repeated after a pause.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

/// Outcome of a retried verification call that never produced a verdict.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Verification API still rate limited after {attempts} attempts")]
    RetryBudgetExhausted { attempts: u32 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors surfaced by the validation pipeline and the recovery service.
///
/// Every variant maps to a generic "try again later" for the end user.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Verification rate limit exceeded for {key}, try again later")]
    RateLimited { key: String },

    #[error("The email could not be verified, try again later: {0}")]
    VerificationUnavailable(#[from] VerifyError),

    #[error("Too many verification attempts, try again in {}s", retry_after.as_secs())]
    TooManyAttempts { retry_after: Duration },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GuardError>;
