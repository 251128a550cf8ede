// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Candidate email addresses.
//!
//! A [`CandidateEmail`] keeps the address exactly as submitted (some rules
//! compare against stored values byte for byte) next to its lower-cased form,
//! which every other rule and the verification API work with.

use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
    )
    .expect("EMAIL_REGEX is a valid regex pattern")
});

/// Maximum address length (RFC 5321).
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum local part length (RFC 5321).
const MAX_LOCAL_PART_LENGTH: usize = 64;

/// Separator between an alias base and its tag.
pub const ALIAS_SEPARATOR: char = '+';

/// An address submitted as a recovery email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEmail {
    submitted: String,
    normalized: String,
}

/// `base+tag@domain` decomposition. `tag` is `None` when the local part has
/// no separator, in which case `base` is the whole local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasParts<'a> {
    pub base: &'a str,
    pub tag: Option<&'a str>,
    pub domain: &'a str,
}

impl AliasParts<'_> {
    /// Whether two addresses deliver to the same base mailbox.
    pub fn same_base(&self, other: &AliasParts<'_>) -> bool {
        self.base == other.base && self.domain == other.domain
    }
}

impl CandidateEmail {
    pub fn new(submitted: &str) -> Self {
        Self {
            submitted: submitted.to_string(),
            normalized: submitted.to_lowercase(),
        }
    }

    /// The address as the user typed it.
    pub fn submitted(&self) -> &str {
        &self.submitted
    }

    /// The lower-cased address.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.submitted.is_empty()
    }

    /// Syntactic validity of the submitted address.
    pub fn is_well_formed(&self) -> bool {
        let email = self.submitted.as_str();
        // `(?i)` folds Unicode, so `ſ` and the Kelvin sign would pass `[a-z]`.
        if !email.is_ascii() || email.len() > MAX_EMAIL_LENGTH {
            return false;
        }
        match email.rsplit_once('@') {
            Some((local, _)) if local.len() <= MAX_LOCAL_PART_LENGTH => EMAIL_REGEX.is_match(email),
            _ => false,
        }
    }

    /// Text before the last `@`.
    pub fn local_part(&self) -> &str {
        self.split().0
    }

    /// Text after the last `@`, empty when there is none.
    pub fn domain(&self) -> &str {
        self.split().1
    }

    pub fn has_alias_tag(&self) -> bool {
        self.local_part().contains(ALIAS_SEPARATOR)
    }

    pub fn alias_parts(&self) -> AliasParts<'_> {
        let (local, domain) = self.split();
        let (base, tag) = match local.split_once(ALIAS_SEPARATOR) {
            Some((base, tag)) => (base, Some(tag)),
            None => (local, None),
        };
        AliasParts { base, tag, domain }
    }

    fn split(&self) -> (&str, &str) {
        self.normalized
            .rsplit_once('@')
            .unwrap_or((self.normalized.as_str(), ""))
    }
}

impl std::fmt::Display for CandidateEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Whether `value` is some `base+tag@domain` alias of the given base.
///
/// Mirrors a `base+%@domain` pattern match: any tag, including an empty one.
pub fn matches_alias_pattern(value: &str, base: &str, domain: &str) -> bool {
    let value = value.to_lowercase();
    let Some((local, value_domain)) = value.rsplit_once('@') else {
        return false;
    };
    value_domain == domain
        && local
            .split_once(ALIAS_SEPARATOR)
            .is_some_and(|(value_base, _)| value_base == base)
}
