// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the validation pipeline.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    /// Limiter admissions by `key` and `outcome` (admitted, exceeded)
    pub admissions: IntCounterVec,
    /// Verification API calls by `check` (domain, email) and `outcome`
    pub verification_calls: IntCounterVec,
    /// Pipeline decisions by `outcome` (valid, a rejection code, or an error kind)
    pub validations: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let admissions = IntCounterVec::new(
            Opts::new(
                "recovery_guard_limiter_admissions_total",
                "Sliding window admissions for verification API calls",
            ),
            &["key", "outcome"],
        )?;
        let verification_calls = IntCounterVec::new(
            Opts::new(
                "recovery_guard_verification_calls_total",
                "Verification API calls by check and verdict",
            ),
            &["check", "outcome"],
        )?;
        let validations = IntCounterVec::new(
            Opts::new(
                "recovery_guard_validations_total",
                "Recovery email validations by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(admissions.clone()))?;
        registry.register(Box::new(verification_calls.clone()))?;
        registry.register(Box::new(validations.clone()))?;

        Ok(Self {
            registry,
            admissions,
            verification_calls,
            validations,
        })
    }

    /// Admissions recorded for `key`, whatever their outcome.
    pub fn admission_calls(&self, key: &str) -> u64 {
        ["admitted", "exceeded"]
            .iter()
            .map(|outcome| self.admissions.with_label_values(&[key, *outcome]).get())
            .sum()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
