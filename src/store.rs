// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Collaborators the guard reads from: per-user attributes and domain lists.
//!
//! The pipeline only reads through these traits. The recovery service is the
//! one writer of user attributes.

use crate::config::RulesConfig;
use crate::email::matches_alias_pattern;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::info;

/// Account email of the user.
pub const ACCOUNT_EMAIL: &str = "email";
/// Verified recovery email.
pub const RECOVERY_EMAIL: &str = "recovery-email";
/// Recovery email awaiting confirmation.
pub const UNVERIFIED_RECOVERY_EMAIL: &str = "unverified-recovery-email";
/// Preferred language.
pub const LOCALE: &str = "lang";

/// Named string attributes per user.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_attribute(&self, user_id: &str, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_attribute(&self, user_id: &str, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete_attribute(&self, user_id: &str, key: &str) -> Result<(), StoreError>;

    /// Users whose `key` attribute equals `value`.
    async fn find_users_by_attribute(
        &self,
        key: &str,
        value: &str,
        case_insensitive: bool,
    ) -> Result<Vec<String>, StoreError>;

    /// Users whose `key` attribute is a `base+<any tag>@domain` alias.
    async fn find_users_by_alias(
        &self,
        key: &str,
        base: &str,
        domain: &str,
    ) -> Result<Vec<String>, StoreError>;
}

/// Domain allow and deny lists.
#[async_trait]
pub trait BlacklistOracle: Send + Sync {
    async fn is_custom_blacklisted(&self, domain: &str) -> bool;

    async fn is_popular_domain(&self, domain: &str) -> bool;

    /// Record a domain the verification API reported as disposable, together
    /// with the domains it says are operated by the same provider.
    async fn add_disposable_domain(&self, domain: &str, related_domains: &[String]);
}

/// In-process [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_attribute(&self, user_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).and_then(|attrs| attrs.get(key)).cloned())
    }

    async fn set_attribute(&self, user_id: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_attribute(&self, user_id: &str, key: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(attrs) = users.get_mut(user_id) {
            attrs.remove(key);
        }
        Ok(())
    }

    async fn find_users_by_attribute(
        &self,
        key: &str,
        value: &str,
        case_insensitive: bool,
    ) -> Result<Vec<String>, StoreError> {
        let users = self.users.read().await;
        let mut found: Vec<String> = users
            .iter()
            .filter(|(_, attrs)| {
                attrs.get(key).is_some_and(|stored| {
                    if case_insensitive {
                        stored.eq_ignore_ascii_case(value)
                    } else {
                        stored == value
                    }
                })
            })
            .map(|(user_id, _)| user_id.clone())
            .collect();
        found.sort();
        Ok(found)
    }

    async fn find_users_by_alias(
        &self,
        key: &str,
        base: &str,
        domain: &str,
    ) -> Result<Vec<String>, StoreError> {
        let users = self.users.read().await;
        let mut found: Vec<String> = users
            .iter()
            .filter(|(_, attrs)| {
                attrs
                    .get(key)
                    .is_some_and(|stored| matches_alias_pattern(stored, base, domain))
            })
            .map(|(user_id, _)| user_id.clone())
            .collect();
        found.sort();
        Ok(found)
    }
}

/// [`BlacklistOracle`] backed by configured lists plus domains learned at runtime.
///
/// A listed domain also covers its subdomains.
#[derive(Debug, Default)]
pub struct DomainLists {
    popular: HashSet<String>,
    blacklist: RwLock<HashSet<String>>,
}

impl DomainLists {
    pub fn new<P, B>(popular: P, blacklist: B) -> Self
    where
        P: IntoIterator<Item = String>,
        B: IntoIterator<Item = String>,
    {
        Self {
            popular: popular.into_iter().map(|d| d.to_lowercase()).collect(),
            blacklist: RwLock::new(blacklist.into_iter().map(|d| d.to_lowercase()).collect()),
        }
    }

    pub fn from_config(config: &RulesConfig) -> Self {
        Self::new(
            config.popular_domains.iter().cloned(),
            config.custom_blacklist.iter().cloned(),
        )
    }

    pub async fn blacklist_len(&self) -> usize {
        self.blacklist.read().await.len()
    }
}

#[async_trait]
impl BlacklistOracle for DomainLists {
    async fn is_custom_blacklisted(&self, domain: &str) -> bool {
        let blacklist = self.blacklist.read().await;
        domain_and_parents(&domain.to_lowercase()).any(|d| blacklist.contains(d))
    }

    async fn is_popular_domain(&self, domain: &str) -> bool {
        self.popular.contains(&domain.to_lowercase())
    }

    async fn add_disposable_domain(&self, domain: &str, related_domains: &[String]) {
        let mut blacklist = self.blacklist.write().await;
        let added = std::iter::once(domain)
            .chain(related_domains.iter().map(String::as_str))
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .filter(|d| blacklist.insert(d.clone()))
            .count();
        info!(%domain, added, "Disposable domains added to blacklist");
    }
}

/// `a.b.c` yields `a.b.c`, `b.c`, `c`.
fn domain_and_parents(domain: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(domain), |d| d.split_once('.').map(|(_, rest)| rest))
}
