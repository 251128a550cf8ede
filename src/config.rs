// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the recovery email guard.
//!
//! Defaults match the production deployment: 2 email checks and 15 domain
//! checks per second against the verification API, 10 retries starting at a
//! 1 second backoff, and at most 5 `+tag` aliases of one base address.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the recovery email guard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Verification API configuration
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Local rule configuration
    #[serde(default)]
    pub rules: RulesConfig,

    /// Per-user submission throttle
    #[serde(default)]
    pub attempts: AttemptConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// External verification API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Base URL of the verification API (default: https://verifymail.io)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// API key (`verify_mail_api_key`)
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Request timeout in seconds (default: 15)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per logical call while the API answers 429 (default: 10)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff interval in milliseconds, doubled per retry (default: 1000)
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
}

/// Sliding-window limits on outbound verification calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in milliseconds (default: 1000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Email checks admitted per window (default: 2)
    #[serde(default = "default_email_check_rate")]
    pub email_check_rate: u32,

    /// Domain checks admitted per window (default: 15)
    #[serde(default = "default_domain_check_rate")]
    pub domain_check_rate: u32,

    /// How many times a caller may wait for a free slot (default: 10)
    #[serde(default = "default_max_wait_attempts")]
    pub max_wait_attempts: u32,

    /// Interval between stale entry sweeps in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Local rule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Legacy platform domain, never accepted as a recovery domain
    #[serde(default)]
    pub legacy_domain: String,

    /// Main platform domain, never accepted as a recovery domain
    #[serde(default)]
    pub main_domain: String,

    /// Max other users sharing one `base+tag@domain` base; negative = unlimited (default: 5)
    #[serde(default = "default_alias_limit")]
    pub alias_limit: i64,

    /// Providers trusted without a domain-level API check
    #[serde(default = "default_popular_domains")]
    pub popular_domains: Vec<String>,

    /// Domains rejected locally
    #[serde(default)]
    pub custom_blacklist: Vec<String>,
}

/// Per-user submission throttle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptConfig {
    /// Submissions allowed per window (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Window length in seconds (default: 3600)
    #[serde(default = "default_attempt_window_secs")]
    pub window_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_base_url() -> String {
    "https://verifymail.io".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    10
}

fn default_initial_interval_ms() -> u64 {
    1000
}

fn default_window_ms() -> u64 {
    1000
}

fn default_email_check_rate() -> u32 {
    2
}

fn default_domain_check_rate() -> u32 {
    15
}

fn default_max_wait_attempts() -> u32 {
    10
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_alias_limit() -> i64 {
    5
}

fn default_popular_domains() -> Vec<String> {
    [
        "gmail.com",
        "googlemail.com",
        "outlook.com",
        "hotmail.com",
        "live.com",
        "yahoo.com",
        "icloud.com",
        "me.com",
        "aol.com",
        "gmx.de",
        "gmx.net",
        "web.de",
        "proton.me",
        "protonmail.com",
        "orange.fr",
        "free.fr",
    ]
    .iter()
    .map(|d| d.to_string())
    .collect()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_attempt_window_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            verification: VerificationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            rules: RulesConfig::default(),
            attempts: AttemptConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_interval_ms: default_initial_interval_ms(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            email_check_rate: default_email_check_rate(),
            domain_check_rate: default_domain_check_rate(),
            max_wait_attempts: default_max_wait_attempts(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            legacy_domain: String::new(),
            main_domain: String::new(),
            alias_limit: default_alias_limit(),
            popular_domains: default_popular_domains(),
            custom_blacklist: Vec::new(),
        }
    }
}

impl Default for AttemptConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_attempt_window_secs(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl VerificationConfig {
    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the first backoff interval
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }
}

impl RateLimitConfig {
    /// Get the sliding window length
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Get the sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl RulesConfig {
    /// Alias limit, or `None` when aliases are unlimited.
    pub fn alias_limit(&self) -> Option<usize> {
        usize::try_from(self.alias_limit).ok()
    }
}

impl AttemptConfig {
    /// Get the throttle window
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `VERIFY_MAIL_API_KEY` is required; everything else falls back to defaults.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }

        config.verification.api_key = lookup("VERIFY_MAIL_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingKey("VERIFY_MAIL_API_KEY"))?;
        if let Some(url) = lookup("VERIFY_MAIL_API_URL") {
            config.verification.api_base_url = url;
        }

        if let Some(domain) = lookup("LEGACY_DOMAIN") {
            config.rules.legacy_domain = domain.trim().to_lowercase();
        }
        if let Some(domain) = lookup("MAIN_DOMAIN") {
            config.rules.main_domain = domain.trim().to_lowercase();
        }
        if let Some(limit) = parse_var(&lookup, "RECOVERY_EMAIL_ALIAS_LIMIT")? {
            config.rules.alias_limit = limit;
        }
        if let Some(list) = lookup("POPULAR_DOMAINS") {
            config.rules.popular_domains = split_list(&list);
        }
        if let Some(list) = lookup("CUSTOM_BLACKLIST") {
            config.rules.custom_blacklist = split_list(&list);
        }

        if let Some(rate) = parse_var(&lookup, "EMAIL_CHECK_RATE")? {
            config.rate_limit.email_check_rate = rate;
        }
        if let Some(rate) = parse_var(&lookup, "DOMAIN_CHECK_RATE")? {
            config.rate_limit.domain_check_rate = rate;
        }
        if let Some(max) = parse_var(&lookup, "MAX_VERIFICATION_ATTEMPTS")? {
            config.attempts.max_attempts = max;
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
