// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for abuse simulation results.

use recovery_email_guard::{GuardError, Rejection, ValidationResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Collects outcomes during a simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Start time of the attack
    start_time: Option<Instant>,
    /// End time of the attack
    end_time: Option<Instant>,
    /// Count of submissions by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of submissions by user
    requests_per_user: HashMap<String, usize>,
    /// Count of submissions by candidate domain
    requests_per_domain: HashMap<String, usize>,
}

/// Possible outcomes for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    InvalidFormat,
    SameAsAccountEmail,
    AlreadyTaken,
    AliasLimited,
    ReservedDomain,
    BlacklistedDomain,
    BlacklistedEmail,
    RateLimited,
    Throttled,
    VerificationUnavailable,
    StoreFailed,
}

impl Outcome {
    /// Rejected by a local rule, without asking the verification API.
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            Outcome::InvalidFormat
                | Outcome::SameAsAccountEmail
                | Outcome::AlreadyTaken
                | Outcome::AliasLimited
                | Outcome::ReservedDomain
                | Outcome::BlacklistedDomain
        )
    }
}

impl From<&Result<ValidationResult, GuardError>> for Outcome {
    fn from(result: &Result<ValidationResult, GuardError>) -> Self {
        match result {
            Ok(ValidationResult::Valid) => Outcome::Allowed,
            Ok(ValidationResult::Rejected(rejection)) => match rejection {
                Rejection::InvalidFormat => Outcome::InvalidFormat,
                Rejection::SameAsAccountEmail => Outcome::SameAsAccountEmail,
                Rejection::AlreadyTaken => Outcome::AlreadyTaken,
                Rejection::AliasLimitExceeded => Outcome::AliasLimited,
                Rejection::ReservedDomain => Outcome::ReservedDomain,
                Rejection::BlacklistedDomain => Outcome::BlacklistedDomain,
                Rejection::BlacklistedEmail => Outcome::BlacklistedEmail,
            },
            Err(GuardError::RateLimited { .. }) => Outcome::RateLimited,
            Err(GuardError::TooManyAttempts { .. }) => Outcome::Throttled,
            Err(GuardError::VerificationUnavailable(_)) => Outcome::VerificationUnavailable,
            Err(GuardError::Store(_)) => Outcome::StoreFailed,
        }
    }
}

impl AttackMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of an attack.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Mark the end of an attack.
    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record a submission outcome.
    pub fn record(&mut self, outcome: Outcome, user_id: &str, candidate: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_user.entry(user_id.to_string()).or_insert(0) += 1;
        if let Some((_, domain)) = candidate.rsplit_once('@') {
            *self.requests_per_domain.entry(domain.to_lowercase()).or_insert(0) += 1;
        }
    }

    /// Get total submission count.
    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Submissions refused by a local rule.
    pub fn local_rejections(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(outcome, _)| outcome.is_local_rejection())
            .map(|(_, n)| n)
            .sum()
    }

    /// Simulated duration of the attack.
    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Get block rate (ratio of refused to total).
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let allowed = self.count(Outcome::Allowed);
        (total - allowed) as f64 / total as f64
    }

    /// Generate a summary report. `api_calls` comes from the scripted API.
    pub fn report(&self, api_calls: usize) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            rejected_locally: self.local_rejections(),
            rejected_by_api: self.count(Outcome::BlacklistedEmail),
            rate_limited: self.count(Outcome::RateLimited),
            throttled: self.count(Outcome::Throttled),
            unavailable: self.count(Outcome::VerificationUnavailable),
            api_calls,
            duration_ms: self.duration().as_millis() as u64,
            block_rate: self.block_rate(),
            unique_users: self.requests_per_user.len(),
            unique_domains: self.requests_per_domain.len(),
        }
    }
}

/// Summary report of a simulation.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub rejected_locally: usize,
    pub rejected_by_api: usize,
    pub rate_limited: usize,
    pub throttled: usize,
    pub unavailable: usize,
    pub api_calls: usize,
    pub duration_ms: u64,
    pub block_rate: f64,
    pub unique_users: usize,
    pub unique_domains: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Simulated time:    {} ms", self.duration_ms)?;
        writeln!(f, "Total Submissions: {}", self.total_requests)?;
        writeln!(f, "API Calls:         {}", self.api_calls)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(f, "Allowed:           {}", self.allowed)?;
        writeln!(f, "Rejected Locally:  {}", self.rejected_locally)?;
        writeln!(f, "Rejected by API:   {}", self.rejected_by_api)?;
        writeln!(f, "Rate Limited:      {}", self.rate_limited)?;
        writeln!(f, "Throttled:         {}", self.throttled)?;
        writeln!(f, "Unavailable:       {}", self.unavailable)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "--- Distribution ---")?;
        writeln!(f, "Unique Users:      {}", self.unique_users)?;
        writeln!(f, "Unique Domains:    {}", self.unique_domains)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();
        metrics.record(Outcome::Allowed, "alice", "a@one.test");
        metrics.record(Outcome::AliasLimited, "bob", "b+1@two.test");
        metrics.record(Outcome::RateLimited, "bob", "b@two.test");

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 1);
        assert_eq!(metrics.local_rejections(), 1);

        let report = metrics.report(2);
        assert_eq!(report.unique_users, 2);
        assert_eq!(report.unique_domains, 2);
        assert_eq!(report.api_calls, 2);
    }

    #[test]
    fn test_block_rate() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, "alice", "a@one.test");
        }
        for _ in 0..7 {
            metrics.record(Outcome::Throttled, "alice", "a@one.test");
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }
}
