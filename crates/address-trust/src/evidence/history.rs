use super::{EvidenceProvider, SignalKind, SignalReading, SignalRequest};
use crate::domain::{round_to, ValidationLevel};
use crate::fingerprint::fingerprint;
use serde_json::json;
use std::sync::Arc;

/// Earlier outcome recorded for the same address fingerprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorValidation {
    pub acs: f64,
    pub vl: ValidationLevel,
}

/// Lookup of prior validations, supplied by whatever persists results.
pub trait ValidationHistory: Send + Sync {
    fn prior_validations(&self, fingerprint: &str) -> Vec<PriorValidation>;
}

/// Prior validations only count once they reached this level.
const TRUSTED_LEVEL: ValidationLevel = ValidationLevel::Vl2;

pub struct HistoryProvider {
    history: Option<Arc<dyn ValidationHistory>>,
}

impl HistoryProvider {
    pub fn new(history: Option<Arc<dyn ValidationHistory>>) -> Self {
        Self { history }
    }
}

impl EvidenceProvider for HistoryProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::History
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        let Some(history) = &self.history else {
            return SignalReading::new(
                0.0,
                json!({
                    "method": "validation_history",
                    "prior_validations": 0,
                    "message": "no prior validation history",
                }),
            );
        };

        let priors = history.prior_validations(&fingerprint(request.address));
        let trusted: Vec<f64> = priors
            .iter()
            .filter(|prior| prior.vl >= TRUSTED_LEVEL)
            .map(|prior| prior.acs)
            .collect();

        let score = if trusted.is_empty() {
            0.0
        } else {
            round_to(trusted.iter().sum::<f64>() / trusted.len() as f64, 2)
        };

        SignalReading::new(
            score,
            json!({
                "method": "validation_history",
                "prior_validations": priors.len(),
                "trusted_validations": trusted.len(),
            }),
        )
    }
}
