// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Abuse patterns for security testing.

/// How candidates are chosen for each submission.
#[derive(Debug, Clone)]
pub enum CandidatePattern {
    /// `base+N@domain`, one alias per submission
    AliasFarm { base: &'static str, domain: &'static str },
    /// Fresh addresses spread over the given domains
    DomainSweep { domains: Vec<&'static str> },
    /// The same address over and over
    Repeat { email: &'static str },
    /// Syntactically broken addresses
    Malformed,
}

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of submissions
    pub total_requests: usize,
    /// Number of distinct submitting users
    pub unique_users: usize,
    pub pattern: CandidatePattern,
    /// Confirm every accepted address, as an attacker controlling the inbox would
    pub verify_accepted: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 20,
            unique_users: 20,
            pattern: CandidatePattern::Repeat {
                email: "someone@knownprovider.com",
            },
            verify_accepted: false,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Many accounts sharing one mailbox through `+tag` aliases.
    pub fn alias_farming() -> Self {
        Self {
            total_requests: 20,
            unique_users: 20,
            pattern: CandidatePattern::AliasFarm {
                base: "farmer",
                domain: "farm.test",
            },
            verify_accepted: true,
        }
    }

    /// Throwaway addresses across one provider's sibling domains.
    pub fn disposable_sweep() -> Self {
        Self {
            total_requests: 30,
            unique_users: 30,
            pattern: CandidatePattern::DomainSweep {
                domains: vec!["burner.test", "burner-mail.test", "burner-inbox.test"],
            },
            ..Default::default()
        }
    }

    /// One account resubmitting as fast as it can.
    pub fn single_user_flood() -> Self {
        Self {
            total_requests: 20,
            unique_users: 1,
            pattern: CandidatePattern::DomainSweep {
                domains: vec!["knownprovider.com"],
            },
            ..Default::default()
        }
    }

    /// Garbage input from many accounts.
    pub fn malformed_flood() -> Self {
        Self {
            total_requests: 40,
            unique_users: 40,
            pattern: CandidatePattern::Malformed,
            ..Default::default()
        }
    }

    /// Many accounts claiming one address.
    pub fn address_squatting() -> Self {
        Self {
            total_requests: 10,
            unique_users: 10,
            pattern: CandidatePattern::Repeat {
                email: "victim@knownprovider.com",
            },
            verify_accepted: true,
        }
    }
}

/// Expected outcomes for different attack types.
pub struct AttackExpectations {
    /// Most submissions that may be accepted
    pub max_allowed: usize,
    /// Most calls the verification API may receive
    pub max_api_calls: usize,
    /// Description of expected behavior
    pub description: &'static str,
}

impl AttackConfig {
    /// Get expected outcomes for this attack pattern, given the alias limit and
    /// per-user attempt budget.
    pub fn expectations(&self, alias_limit: usize, max_attempts: usize) -> AttackExpectations {
        match &self.pattern {
            CandidatePattern::Malformed => AttackExpectations {
                max_allowed: 0,
                max_api_calls: 0,
                description: "All submissions should fail the format check",
            },
            CandidatePattern::AliasFarm { .. } => AttackExpectations {
                max_allowed: alias_limit,
                // Domain and email check per accepted alias
                max_api_calls: alias_limit * 2 + 2,
                description: "Aliases beyond the limit should be refused locally",
            },
            CandidatePattern::DomainSweep { domains } if self.unique_users == 1 => AttackExpectations {
                max_allowed: max_attempts,
                max_api_calls: max_attempts * (domains.len() + 1),
                description: "A single user should be capped by the attempt throttle",
            },
            CandidatePattern::DomainSweep { domains } => AttackExpectations {
                max_allowed: 0,
                max_api_calls: domains.len(),
                description: "The provider should be blacklisted after its first lookup",
            },
            CandidatePattern::Repeat { .. } => AttackExpectations {
                max_allowed: 1,
                max_api_calls: 1,
                description: "Only the first claimant should get the address",
            },
        }
    }
}
