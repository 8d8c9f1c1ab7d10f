//! Weighted combination of evidence signals into an Address Confidence Score.

mod config;
mod confirmation;
mod fixtures;
mod metrics;
mod reasons;

#[cfg(test)]
mod tests;

pub use config::{ScoringConfig, ThresholdError, VlThresholds, WeightError, WeightVector, WEIGHT_TOLERANCE};
pub use confirmation::{Confirmation, CONFIRMERS};
pub use fixtures::{DemoFixtures, FixtureOverrides, FixtureResult};
pub use metrics::{
    AdvancedMetrics, CategoryComparison, EscalationPath, FraudRisk, RiskLevel,
};
pub use reasons::{reason_codes, suggestions, NO_IMPROVEMENTS};

use crate::corpus::ReferenceCorpora;
use crate::domain::{round_to, Address, ValidationLevel};
use crate::evidence::{
    standard_providers, Evidence, EvidenceProvider, Finding, SignalKind, SignalReading,
    SignalRequest, ValidationHistory,
};
use crate::fingerprint::fingerprint;
use crate::geo::postal_cell_distance_km;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one scoring run. Never mutated; confirmation produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub address: Address,
    pub acs: f64,
    pub vl: ValidationLevel,
    pub reason_codes: Vec<String>,
    pub suggestions: Vec<String>,
    /// One component per signal, in [`SignalKind::ordered`] order.
    pub evidence: Vec<Evidence>,
    pub advanced: AdvancedMetrics,
    pub as_of: NaiveDateTime,
}

impl ScoreResult {
    pub fn evidence_for(&self, kind: SignalKind) -> Option<&Evidence> {
        self.evidence.iter().find(|component| component.kind == kind)
    }

    pub fn score_of(&self, kind: SignalKind) -> f64 {
        self.evidence_for(kind).map(|component| component.score).unwrap_or(0.0)
    }
}

/// Stateless scorer over shared read-only corpora. Configuration is fixed at
/// construction; a recalibrated configuration means a new engine.
#[derive(Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
    corpora: Arc<ReferenceCorpora>,
    providers: Vec<Arc<dyn EvidenceProvider>>,
    fixtures: Option<Arc<dyn FixtureOverrides>>,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig, corpora: Arc<ReferenceCorpora>) -> Self {
        Self {
            providers: standard_providers(Arc::clone(&corpora), None),
            config,
            corpora,
            fixtures: None,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn ValidationHistory>) -> Self {
        self.providers = standard_providers(Arc::clone(&self.corpora), Some(history));
        self
    }

    pub fn with_fixture_overrides(mut self, fixtures: Arc<dyn FixtureOverrides>) -> Self {
        self.fixtures = Some(fixtures);
        self
    }

    /// Same providers and corpora under a different configuration.
    pub fn reconfigured(&self, config: ScoringConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn corpora(&self) -> &ReferenceCorpora {
        &self.corpora
    }

    pub fn score(&self, address: &Address) -> ScoreResult {
        self.score_at(address, Utc::now().naive_utc())
    }

    /// Scores as of a fixed instant so results are reproducible.
    pub fn score_at(&self, address: &Address, as_of: NaiveDateTime) -> ScoreResult {
        if let Some(fixture) = self
            .fixtures
            .as_ref()
            .and_then(|fixtures| fixtures.lookup(&address.cell_id))
        {
            debug!(cell_id = %address.cell_id, acs = fixture.acs, "fixture override applied");
            return self.fixture_result(address, fixture, as_of);
        }

        let evidence = self.collect_evidence(address, as_of);
        let acs = self.combine(&evidence);
        let vl = self.validation_level(acs);
        let advanced = AdvancedMetrics::compute(acs, &address.city, fingerprint(address), &evidence);

        debug!(
            cell_id = %address.cell_id,
            acs,
            vl = vl.label(),
            escalation = advanced.escalation_path.label(),
            "address scored"
        );

        ScoreResult {
            address: address.clone(),
            acs,
            vl,
            reason_codes: reason_codes(&evidence),
            suggestions: suggestions(&evidence),
            evidence,
            advanced,
            as_of,
        }
    }

    /// Raw component scores in [`SignalKind::ordered`] order, independent of
    /// the weight vector.
    pub fn signal_scores_at(&self, address: &Address, as_of: NaiveDateTime) -> [f64; SignalKind::COUNT] {
        let evidence = self.collect_evidence(address, as_of);
        SignalKind::ordered().map(|kind| {
            evidence
                .iter()
                .find(|component| component.kind == kind)
                .map(|component| component.score)
                .unwrap_or(0.0)
        })
    }

    pub fn validation_level(&self, acs: f64) -> ValidationLevel {
        self.config.thresholds.level_for(acs)
    }

    /// Applies a human confirmation. Unconfirmed input leaves scores as they
    /// were; an administrator-assigned level applies either way.
    pub fn confirm(&self, result: &ScoreResult, confirmation: &Confirmation) -> ScoreResult {
        let mut next = result.clone();

        if confirmation.confirmed {
            next.acs = confirmation::boost(result.acs, &mut next.evidence);
            next.vl = self.validation_level(next.acs);
            next.advanced = AdvancedMetrics::compute(
                next.acs,
                &next.address.city,
                result.advanced.address_fingerprint.clone(),
                &next.evidence,
            );
        }

        if let Some(level) = confirmation.mark_vl {
            next.vl = level;
        }

        debug!(
            cell_id = %next.address.cell_id,
            old_acs = result.acs,
            new_acs = next.acs,
            vl = next.vl.label(),
            "confirmation applied"
        );
        next
    }

    /// Whether the result is strong enough for a credential to be minted.
    pub fn issuance_warranted(&self, result: &ScoreResult) -> bool {
        result.acs >= self.config.issuance_threshold
    }

    fn collect_evidence(&self, address: &Address, as_of: NaiveDateTime) -> Vec<Evidence> {
        let mut evidence: Vec<Evidence> = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let kind = provider.kind();
            let reading = provider.score(&SignalRequest {
                address,
                as_of,
                earlier: &evidence,
            });
            evidence.push(Evidence::from_reading(kind, reading, self.config.weights.weight(kind)));
        }

        evidence.sort_by_key(|component| component.kind);
        evidence
    }

    fn combine(&self, evidence: &[Evidence]) -> f64 {
        let total: f64 = evidence
            .iter()
            .map(|component| component.score * component.weight)
            .sum();
        round_to(total, 2).clamp(0.0, 100.0)
    }

    fn fixture_result(&self, address: &Address, fixture: FixtureResult, as_of: NaiveDateTime) -> ScoreResult {
        let distance = postal_cell_distance_km(&self.corpora, &address.postal_code, &address.cell_id);

        let evidence: Vec<Evidence> = SignalKind::ordered()
            .into_iter()
            .zip(fixture.scores)
            .map(|(kind, score)| {
                let mut reading = SignalReading::new(score, json!({"method": "fixture_override"}));
                if let (SignalKind::GeoPrecision, Some(km)) = (kind, distance) {
                    reading = reading.with_finding(Finding::PostalCellDistanceKm {
                        km: round_to(km, 2),
                    });
                }
                Evidence::from_reading(kind, reading, self.config.weights.weight(kind))
            })
            .collect();

        ScoreResult {
            address: address.clone(),
            acs: fixture.acs,
            vl: self.validation_level(fixture.acs),
            reason_codes: fixture.reason_codes,
            suggestions: fixture.suggestions,
            advanced: AdvancedMetrics::compute(fixture.acs, &address.city, fingerprint(address), &evidence),
            evidence,
            as_of,
        }
    }
}
