//! Exact-match address identity: a SHA-256 digest over canonicalised fields.

use crate::domain::Address;
use sha2::{Digest, Sha256};

const FIELD_DELIMITER: &str = "||";

/// Lowercases, strips punctuation other than `-` and `/`, and collapses
/// whitespace runs to a single space.
pub fn canonicalize(value: &str) -> String {
    let kept: String = value
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || matches!(ch, '_' | '-' | '/'))
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex-encoded SHA-256 of the canonical address. Empty fields keep their slot
/// so a value moving between fields changes the digest.
pub fn fingerprint(address: &Address) -> String {
    let canonical = address
        .fields()
        .iter()
        .map(|(_, value)| canonicalize(value))
        .collect::<Vec<_>>()
        .join(FIELD_DELIMITER);

    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}

/// 1.0 for identical fingerprints, 0.0 otherwise.
pub fn compare_fingerprints(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}

pub fn fingerprint_components(address: &Address) -> Vec<(&'static str, String)> {
    address
        .fields()
        .iter()
        .map(|(name, value)| (*name, canonicalize(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address {
            house_number: "12/4".to_string(),
            street: "M.G. Road".to_string(),
            locality: "Indira Nagar".to_string(),
            city: "Bangalore".to_string(),
            district: "Bangalore Urban".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "560038".to_string(),
            cell_id: "BG-5600-38-IN".to_string(),
        }
    }

    #[test]
    fn canonicalize_keeps_hyphen_and_slash() {
        assert_eq!(canonicalize("  No. 12/4,  Near   Temple-Road "), "no 12/4 near temple-road");
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = fingerprint(&sample());
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    #[test]
    fn case_and_spacing_do_not_change_fingerprint() {
        let mut noisy = sample();
        noisy.street = "  m.g.   ROAD ".to_string();
        noisy.city = "BANGALORE".to_string();
        assert_eq!(fingerprint(&noisy), fingerprint(&sample()));
    }

    #[test]
    fn every_field_contributes() {
        let base = fingerprint(&sample());
        let mut changed = sample();
        changed.cell_id = "BG-5600-38-IO".to_string();
        assert_ne!(fingerprint(&changed), base);

        let mut shifted = sample();
        shifted.district = String::new();
        shifted.state = "Bangalore Urban Karnataka".to_string();
        assert_ne!(fingerprint(&shifted), base);
    }

    #[test]
    fn compare_is_exact_match_only() {
        let fp = fingerprint(&sample());
        assert_eq!(compare_fingerprints(&fp, &fp), 1.0);
        assert_eq!(compare_fingerprints(&fp, &fp[..63]), 0.0);
    }

    #[test]
    fn components_follow_field_order() {
        let components = fingerprint_components(&sample());
        assert_eq!(components[1], ("street", "mg road".to_string()));
        assert_eq!(components[7].0, "cell_id");
    }
}
