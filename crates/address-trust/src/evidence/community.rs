use super::{EvidenceProvider, SignalKind, SignalReading, SignalRequest};
use serde_json::json;

/// Cities with broad property-registry coverage.
pub const HIGH_COVERAGE_CITIES: [&str; 6] =
    ["thrissur", "delhi", "mumbai", "bangalore", "chennai", "hyderabad"];

const VALIDATORS: [&str; 3] = ["postman", "kirana_store", "neighbor"];

pub(crate) fn is_well_formed_postal_code(postal_code: &str) -> bool {
    postal_code.len() == 6 && postal_code.bytes().all(|byte| byte.is_ascii_digit())
}

/// Documentary coverage proxy keyed on city and postal-code shape.
pub struct DocumentaryProvider;

impl EvidenceProvider for DocumentaryProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Doc
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        let city = request.address.city.trim().to_lowercase();
        let postal_code = request.address.postal_code.trim();

        if !is_well_formed_postal_code(postal_code) {
            return SignalReading::new(0.0, json!({"method": "no_match", "matched": false}));
        }

        if HIGH_COVERAGE_CITIES.contains(&city.as_str()) {
            SignalReading::new(
                80.0,
                json!({
                    "method": "property_tax_match",
                    "matched": true,
                    "source": "property_registry",
                    "city": city,
                }),
            )
        } else {
            SignalReading::new(
                40.0,
                json!({
                    "method": "partial_kyc_match",
                    "matched": false,
                    "message": "limited documentary coverage",
                }),
            )
        }
    }
}

/// Community confirmations, simulated deterministically from the cell
/// identifier until a validator network is connected.
pub struct CrowdProvider;

impl CrowdProvider {
    fn bucket(cell_id: &str) -> u32 {
        cell_id.chars().map(|ch| ch as u32 % 100).sum::<u32>() % 100
    }
}

impl EvidenceProvider for CrowdProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Crowd
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        let (score, confirmations) = match Self::bucket(&request.address.cell_id) {
            h if h < 30 => (0.0, 0),
            h if h < 60 => (40.0, 1),
            h if h < 85 => (70.0, 2),
            _ => (100.0, 3),
        };

        SignalReading::new(
            score,
            json!({
                "method": "crowd_validation",
                "confirmations": confirmations,
                "validators": &VALIDATORS[..confirmations],
            }),
        )
    }
}
