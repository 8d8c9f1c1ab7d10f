use crate::evidence::SignalKind;

/// Canned outcome for a known cell identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureResult {
    pub acs: f64,
    /// Component scores in [`SignalKind::ordered`] order.
    pub scores: [f64; SignalKind::COUNT],
    pub reason_codes: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Fixed identifier-to-result table consulted before any provider runs.
/// Engines only consult it when one is injected.
pub trait FixtureOverrides: Send + Sync {
    fn lookup(&self, cell_id: &str) -> Option<FixtureResult>;
}

/// Demonstration cells with stable high, medium and low outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoFixtures;

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl FixtureOverrides for DemoFixtures {
    fn lookup(&self, cell_id: &str) -> Option<FixtureResult> {
        let fixture = match cell_id {
            "BG-5600-38-IN" => FixtureResult {
                acs: 95.0,
                scores: [100.0, 100.0, 100.0, 90.0, 100.0, 90.0, 100.0, 100.0, 100.0, 80.0],
                reason_codes: owned(&[
                    "geo_exact_match",
                    "delivery_history_found",
                    "iot_ping_active",
                    "community_validated",
                    "evidence_strong_agreement",
                ]),
                suggestions: owned(&["Address is fully verified and trusted."]),
            },
            "ND-2013-01-S4" => FixtureResult {
                acs: 72.0,
                scores: [80.0, 70.0, 60.0, 50.0, 40.0, 50.0, 40.0, 80.0, 60.0, 0.0],
                reason_codes: owned(&["geo_partial_match", "limited_delivery_history", "iot_ping_old"]),
                suggestions: owned(&[
                    "Request a test delivery to improve score",
                    "Verify exact location pin",
                ]),
            },
            "MP-4500-01-XX" => FixtureResult {
                acs: 25.0,
                scores: [40.0, 30.0, 0.0, 0.0, 0.0, 0.0, 0.0, 40.0, 20.0, 0.0],
                reason_codes: owned(&["geo_mismatch", "no_delivery_history", "no_iot_signal"]),
                suggestions: owned(&["Complete KYC verification", "Address appears incomplete"]),
            },
            _ => return None,
        };
        Some(fixture)
    }
}
