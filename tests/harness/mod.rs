// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for the recovery email guard.
//!
//! Wires the real pipeline to an in-memory user store and a scripted
//! verification API, and simulates abuse patterns against it.

#![allow(dead_code)]

pub mod attacks;
pub mod generators;
pub mod metrics;

use mock_api::ScriptedApi;
use recovery_email_guard::{
    attempts::AttemptThrottle,
    config::Config,
    handlers::AppState,
    limiter::SlidingWindowLimiter,
    metrics::Metrics,
    pipeline::ValidationPipeline,
    recovery::RecoveryEmailService,
    store::{DomainLists, MemoryUserStore, UserStore, RECOVERY_EMAIL},
};
use std::sync::Arc;

pub const LEGACY_DOMAIN: &str = "legacy.example";
pub const MAIN_DOMAIN: &str = "main.example";
pub const POPULAR_DOMAIN: &str = "knownprovider.com";
pub const BLOCKED_DOMAIN: &str = "blocked.test";

/// Defaults plus the platform domains and lists the tests rely on.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.verification.api_key = "test-key".to_string();
    config.rules.legacy_domain = LEGACY_DOMAIN.to_string();
    config.rules.main_domain = MAIN_DOMAIN.to_string();
    config.rules.popular_domains = vec![POPULAR_DOMAIN.to_string(), "gmail.com".to_string()];
    config.rules.custom_blacklist = vec![BLOCKED_DOMAIN.to_string()];
    config
}

/// A fully wired pipeline with handles on every collaborator.
pub struct Fixture {
    pub config: Config,
    pub users: Arc<MemoryUserStore>,
    pub lists: Arc<DomainLists>,
    pub api: Arc<ScriptedApi>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub metrics: Arc<Metrics>,
    pub pipeline: Arc<ValidationPipeline>,
}

impl Fixture {
    pub fn new(api: ScriptedApi) -> Self {
        Self::with_config(test_config(), api)
    }

    pub fn with_config(config: Config, api: ScriptedApi) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let lists = Arc::new(DomainLists::from_config(&config.rules));
        let api = Arc::new(api);
        let limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limit.window_duration()));
        let metrics = Arc::new(Metrics::new().unwrap());

        let pipeline = Arc::new(ValidationPipeline::new(
            &config,
            users.clone(),
            lists.clone(),
            api.clone(),
            limiter.clone(),
            metrics.clone(),
        ));

        Self {
            config,
            users,
            lists,
            api,
            limiter,
            metrics,
            pipeline,
        }
    }

    /// A recovery service over this fixture's store and pipeline, with a fresh throttle.
    pub fn service(&self) -> RecoveryEmailService {
        RecoveryEmailService::new(
            self.users.clone(),
            self.pipeline.clone(),
            AttemptThrottle::new(self.config.attempts.clone()),
        )
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            service: self.service(),
            metrics: self.metrics.clone(),
            config: self.config.clone(),
        })
    }

    /// Give `user_id` a verified recovery email.
    pub async fn hold_recovery_email(&self, user_id: &str, email: &str) {
        self.users
            .set_attribute(user_id, RECOVERY_EMAIL, email)
            .await
            .unwrap();
    }
}
