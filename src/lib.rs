// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Recovery Email Guard
//!
//! This crate decides whether an email address may become a user's account
//! recovery address:
//!
//! - Format, self-match and uniqueness checks
//! - Alias farming limits (`base+tag@domain`)
//! - Reserved platform domains and a custom domain blacklist
//! - Disposable and deliverability checks against a verification API
//! - Sliding window rate limiting of API calls, with backoff on 429
//! - Per-user submission throttling

pub mod attempts;
pub mod config;
pub mod email;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod pipeline;
pub mod recovery;
pub mod retry;
pub mod rules;
pub mod store;
pub mod verify;

pub use config::Config;
pub use error::{GuardError, Result};
pub use limiter::{Admission, SlidingWindowLimiter};
pub use pipeline::ValidationPipeline;
pub use recovery::RecoveryEmailService;
pub use rules::{Rejection, UserContext, ValidationResult};
