//! Evidence signal providers.
//!
//! Each provider turns an [`Address`] plus read-only reference data into one
//! 0-100 reading. Providers never fail: absent data degrades to a documented
//! default score and a `method` detail explaining why.

mod activity;
mod agreement;
mod community;
mod geo;
mod history;
mod landmarks;

pub use activity::{DeliveryDecayProvider, DeliveryHistoryProvider, DevicePresenceProvider};
pub use agreement::{agreement_score, Agreement, AgreementProvider};
pub use community::{CrowdProvider, DocumentaryProvider};
pub use geo::{GeoMatchProvider, GeoPrecisionProvider};
pub use history::{HistoryProvider, PriorValidation, ValidationHistory};
pub use landmarks::LinguisticProvider;

use crate::corpus::ReferenceCorpora;
use crate::domain::Address;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The ten signal types, in canonical weight-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Geo,
    GeoPrecision,
    Temporal,
    TemporalDecay,
    Iot,
    Doc,
    Crowd,
    Linguistic,
    CrossCorpus,
    History,
}

impl SignalKind {
    pub const COUNT: usize = 10;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::Geo,
            Self::GeoPrecision,
            Self::Temporal,
            Self::TemporalDecay,
            Self::Iot,
            Self::Doc,
            Self::Crowd,
            Self::Linguistic,
            Self::CrossCorpus,
            Self::History,
        ]
    }

    /// Independent signals whose agreement the cross-corpus score measures.
    pub const fn primary() -> [Self; 5] {
        [Self::Geo, Self::Temporal, Self::Iot, Self::Doc, Self::Crowd]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Geo => "geo",
            Self::GeoPrecision => "geo_precision",
            Self::Temporal => "temporal",
            Self::TemporalDecay => "temporal_decay",
            Self::Iot => "iot",
            Self::Doc => "doc",
            Self::Crowd => "crowd",
            Self::Linguistic => "linguistic",
            Self::CrossCorpus => "cross_corpus",
            Self::History => "history",
        }
    }

    pub const fn env_key(self) -> &'static str {
        match self {
            Self::Geo => "GEO_WEIGHT",
            Self::GeoPrecision => "GEO_PRECISION_WEIGHT",
            Self::Temporal => "TEMPORAL_WEIGHT",
            Self::TemporalDecay => "TEMPORAL_DECAY_WEIGHT",
            Self::Iot => "IOT_WEIGHT",
            Self::Doc => "DOC_WEIGHT",
            Self::Crowd => "CROWD_WEIGHT",
            Self::Linguistic => "LINGUISTIC_WEIGHT",
            Self::CrossCorpus => "CROSS_CORPUS_WEIGHT",
            Self::History => "HISTORY_WEIGHT",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Geo => "Grid match",
            Self::GeoPrecision => "Geospatial precision",
            Self::Temporal => "Delivery history",
            Self::TemporalDecay => "Delivery recency",
            Self::Iot => "Device presence",
            Self::Doc => "Documentary",
            Self::Crowd => "Community",
            Self::Linguistic => "Landmark language",
            Self::CrossCorpus => "Cross-corpus agreement",
            Self::History => "Validation history",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Suspicious delivery-velocity patterns surfaced by the decay signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudPattern {
    ExcessiveVelocity7d,
    SuspiciousVelocity1d,
}

impl FraudPattern {
    pub const fn code(self) -> &'static str {
        match self {
            Self::ExcessiveVelocity7d => "excessive_velocity_7d",
            Self::SuspiciousVelocity1d => "suspicious_velocity_1d",
        }
    }
}

/// Typed facts a provider reports alongside its free-form details. The engine
/// reads only these when deriving reasons, suggestions and metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    CellNotInGrid,
    GridLocality { locality: String },
    Velocity {
        penalty: f64,
        patterns: Vec<FraudPattern>,
    },
    PostalCellDistanceKm { km: f64 },
}

/// One provider's output before weighting.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalReading {
    pub score: f64,
    pub details: Value,
    pub findings: Vec<Finding>,
}

impl SignalReading {
    pub fn new(score: f64, details: Value) -> Self {
        Self {
            score: score.clamp(0.0, 100.0),
            details,
            findings: Vec::new(),
        }
    }

    pub fn with_finding(mut self, finding: Finding) -> Self {
        self.findings.push(finding);
        self
    }
}

/// One weighted component of a score result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub score: f64,
    pub weight: f64,
    pub details: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
}

impl Evidence {
    pub fn from_reading(kind: SignalKind, reading: SignalReading, weight: f64) -> Self {
        Self {
            kind,
            score: reading.score,
            weight,
            details: reading.details,
            findings: reading.findings,
        }
    }
}

/// Inputs to one provider call.
#[derive(Debug, Clone, Copy)]
pub struct SignalRequest<'a> {
    pub address: &'a Address,
    /// Instant every recency computation is measured from.
    pub as_of: NaiveDateTime,
    /// Readings produced earlier in the same run.
    pub earlier: &'a [Evidence],
}

impl SignalRequest<'_> {
    pub fn earlier_score(&self, kind: SignalKind) -> Option<f64> {
        self.earlier
            .iter()
            .find(|evidence| evidence.kind == kind)
            .map(|evidence| evidence.score)
    }
}

pub trait EvidenceProvider: Send + Sync {
    fn kind(&self) -> SignalKind;
    fn score(&self, request: &SignalRequest<'_>) -> SignalReading;
}

/// The ten providers in evaluation order. Cross-corpus agreement runs last so
/// every primary reading is available to it.
pub fn standard_providers(
    corpora: Arc<ReferenceCorpora>,
    history: Option<Arc<dyn ValidationHistory>>,
) -> Vec<Arc<dyn EvidenceProvider>> {
    vec![
        Arc::new(GeoMatchProvider::new(Arc::clone(&corpora))),
        Arc::new(DeliveryHistoryProvider::new(Arc::clone(&corpora))),
        Arc::new(DevicePresenceProvider::new(Arc::clone(&corpora))),
        Arc::new(DocumentaryProvider),
        Arc::new(CrowdProvider),
        Arc::new(GeoPrecisionProvider::new(Arc::clone(&corpora))),
        Arc::new(DeliveryDecayProvider::new(Arc::clone(&corpora))),
        Arc::new(LinguisticProvider::new(corpora)),
        Arc::new(HistoryProvider::new(history)),
        Arc::new(AgreementProvider),
    ]
}

/// Whole days elapsed from `at` to `as_of`; negative for future instants.
pub(crate) fn days_between(at: NaiveDateTime, as_of: NaiveDateTime) -> i64 {
    (as_of - at).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_names_round_trip() {
        for kind in SignalKind::ordered() {
            assert_eq!(SignalKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(SignalKind::from_name(" Cross_Corpus "), Some(SignalKind::CrossCorpus));
        assert!(SignalKind::from_name("weather").is_none());
    }

    #[test]
    fn ordered_matches_derived_ordering() {
        let ordered = SignalKind::ordered();
        assert!(ordered.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn standard_providers_cover_every_signal_once() {
        let providers = standard_providers(Arc::new(ReferenceCorpora::default()), None);
        let mut kinds: Vec<SignalKind> = providers.iter().map(|provider| provider.kind()).collect();
        assert_eq!(kinds.last(), Some(&SignalKind::CrossCorpus));
        kinds.sort();
        assert_eq!(kinds, SignalKind::ordered().to_vec());
    }

    #[test]
    fn reading_scores_are_clamped() {
        assert_eq!(SignalReading::new(140.0, Value::Null).score, 100.0);
        assert_eq!(SignalReading::new(-3.0, Value::Null).score, 0.0);
    }

    #[test]
    fn evidence_serializes_kind_as_type() {
        let evidence = Evidence::from_reading(
            SignalKind::TemporalDecay,
            SignalReading::new(42.0, serde_json::json!({"method": "temporal_decay"})),
            0.047,
        );
        let value = serde_json::to_value(&evidence).expect("serializes");
        assert_eq!(value["type"], "temporal_decay");
        assert!(value.get("findings").is_none());
    }
}
