// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

/// Generate a pool of user ids.
pub fn generate_users(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("user-{:04}", i)).collect()
}

/// Generate `base+tag@domain` aliases of one mailbox.
pub fn generate_aliases(count: usize, base: &str, domain: &str) -> Vec<String> {
    (0..count)
        .map(|i| format!("{}+{}@{}", base, i, domain))
        .collect()
}

/// Generate addresses spread over the given domains, round-robin.
pub fn generate_addresses(count: usize, domains: &[&str]) -> Vec<String> {
    (0..count)
        .map(|i| format!("inbox{}@{}", i, domains[i % domains.len()]))
        .collect()
}

/// Addresses the format check must refuse.
pub fn generate_malformed_emails() -> Vec<&'static str> {
    vec![
        "plainaddress",
        "@missing-local.test",
        "missing-domain@",
        "two@@ats.test",
        "spaces in@local.test",
        "user@no-tld",
        "user@.leading-dot.test",
        "user@domain..test",
        "<script>@xss.test",
        "user@domain.test\n",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_users() {
        let users = generate_users(256);
        assert_eq!(users.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = users.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_aliases() {
        let aliases = generate_aliases(3, "farmer", "farm.test");
        assert_eq!(aliases, vec!["farmer+0@farm.test", "farmer+1@farm.test", "farmer+2@farm.test"]);
    }

    #[test]
    fn test_generate_addresses_round_robin() {
        let addresses = generate_addresses(4, &["a.test", "b.test"]);
        assert!(addresses[0].ends_with("@a.test"));
        assert!(addresses[1].ends_with("@b.test"));
        assert!(addresses[2].ends_with("@a.test"));
    }
}
