// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Verification API client.
//!
//! The API answers `GET {base}/api/{email-or-domain}?key={api_key}` with a
//! JSON object. Domain lookups carry `disposable`, `mx` and
//! `related_domains`; email lookups carry `disposable` and
//! `deliverable_email`. A 429 is the only answer worth retrying.

use crate::config::VerificationConfig;
use crate::error::{ApiError, ConfigError, VerifyError};
use crate::retry::{call_with_retry, RetryPolicy};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Domain lookup response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DomainReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub disposable: bool,
    #[serde(default)]
    pub mx: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub related_domains: Vec<String>,
}

/// Email lookup response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmailReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub disposable: bool,
    #[serde(default)]
    pub deliverable_email: Option<bool>,
}

/// An explicit `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What the API concluded about an email or a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// Throwaway provider. `related_domains` lists sibling domains of the same provider.
    Disposable { related_domains: Vec<String> },
    /// Mailbox does not accept mail.
    Undeliverable,
    /// Domain has no mail exchanger.
    NoMailExchanger { related_domains: Vec<String> },
}

impl DomainReport {
    pub fn verdict(self) -> Verdict {
        if self.disposable {
            Verdict::Disposable {
                related_domains: self.related_domains,
            }
        } else if self.mx != Some(true) {
            Verdict::NoMailExchanger {
                related_domains: self.related_domains,
            }
        } else {
            Verdict::Allowed
        }
    }
}

impl EmailReport {
    pub fn verdict(self) -> Verdict {
        if self.disposable {
            Verdict::Disposable {
                related_domains: Vec::new(),
            }
        } else if self.deliverable_email == Some(false) {
            Verdict::Undeliverable
        } else {
            Verdict::Allowed
        }
    }
}

/// Parse a domain lookup body.
pub fn parse_domain_report(body: &str) -> Result<DomainReport, ApiError> {
    parse_object(body)
}

/// Parse an email lookup body.
pub fn parse_email_report(body: &str) -> Result<EmailReport, ApiError> {
    parse_object(body)
}

fn parse_object<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(ApiError::Malformed(format!("expected a JSON object, got {value}")));
    }
    serde_json::from_value(value).map_err(|e| ApiError::Malformed(e.to_string()))
}

/// The external verification service.
#[async_trait]
pub trait VerificationApi: Send + Sync {
    async fn lookup_domain(&self, domain: &str) -> Result<DomainReport, ApiError>;

    async fn lookup_email(&self, email: &str) -> Result<EmailReport, ApiError>;
}

/// HTTP client for the verification API.
pub struct VerifyMailClient {
    base_url: Url,
    api_key: String,
    client: reqwest::Client,
}

impl VerifyMailClient {
    pub fn new(config: &VerificationConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: Url::parse(&config.api_base_url)?,
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// `{base}/api/{target}?key={api_key}`
    fn endpoint(&self, target: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("api").push(target);
        }
        url.query_pairs_mut().append_pair("key", &self.api_key);
        url
    }

    async fn fetch(&self, target: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .get(self.endpoint(target))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        debug!(lookup = %target, status = status.as_u16(), "Verification API responded");

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.without_url().to_string()))
    }
}

#[async_trait]
impl VerificationApi for VerifyMailClient {
    async fn lookup_domain(&self, domain: &str) -> Result<DomainReport, ApiError> {
        let body = self.fetch(domain).await?;
        parse_domain_report(&body)
    }

    async fn lookup_email(&self, email: &str) -> Result<EmailReport, ApiError> {
        let body = self.fetch(email).await?;
        parse_email_report(&body)
    }
}

/// Verification calls wrapped in the retry policy, mapped to verdicts.
#[derive(Clone)]
pub struct VerificationClient {
    api: Arc<dyn VerificationApi>,
    policy: RetryPolicy,
}

impl VerificationClient {
    pub fn new(api: Arc<dyn VerificationApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    pub async fn check_domain(&self, domain: &str) -> Result<Verdict, VerifyError> {
        let report = call_with_retry(&self.policy, "domain-check", || self.api.lookup_domain(domain)).await?;
        Ok(report.verdict())
    }

    pub async fn check_email(&self, email: &str) -> Result<Verdict, VerifyError> {
        let report = call_with_retry(&self.policy, "email-check", || self.api.lookup_email(email)).await?;
        Ok(report.verdict())
    }
}
