//! Deterministic identifiers derived from entity names.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
const UID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Stable secondary key for waste items, streams and facilities.
pub struct Uid(pub String);

impl fmt::Display for Uid {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Fingerprint a name: the first 16 hex characters of the SHA-256 of its trimmed form.
///
/// The result only depends on the trimmed name, so it is stable across runs
/// and identical for a facility and a waste item sharing a name.
#[must_use]
pub fn fingerprint(name: &str) -> Uid {
    let digest = Sha256::digest(name.trim().as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(UID_LEN);
    Uid(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint("Biotonne"), fingerprint("Biotonne"));
        assert_eq!(fingerprint("Biotonne").0.len(), UID_LEN);
    }

    #[test]
    fn fingerprint_ignores_surrounding_whitespace() {
        assert_eq!(fingerprint("  Wertstoffhof Nord\t"), fingerprint("Wertstoffhof Nord"));
    }

    #[test]
    fn fingerprint_matches_known_digest() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(fingerprint("abc").0, "ba7816bf8f01cfea");
    }

    #[test]
    fn distinct_names_get_distinct_fingerprints() {
        assert_ne!(fingerprint("Wertstoffhof Nord"), fingerprint("Wertstoffhof West"));
    }
}
