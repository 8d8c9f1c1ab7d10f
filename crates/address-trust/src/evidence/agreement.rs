use super::{EvidenceProvider, SignalKind, SignalReading, SignalRequest};
use crate::domain::round_to;
use serde_json::{json, Map, Value};

const SPREAD_PENALTY: f64 = 2.5;
const HIGH_CONFIDENCE: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agreement {
    pub score: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub high_confidence: usize,
}

/// Agreement between the five primary readings: 100 minus 2.5 points per unit
/// of population standard deviation, plus a corroboration bonus when most
/// signals are independently strong.
pub fn agreement_score(scores: &[f64; 5]) -> Agreement {
    let count = scores.len() as f64;
    // offsets from the first reading keep equal readings at exactly zero spread
    let origin = scores[0];
    let mean_offset = scores.iter().map(|score| score - origin).sum::<f64>() / count;
    let variance = scores
        .iter()
        .map(|score| (score - origin - mean_offset).powi(2))
        .sum::<f64>()
        / count;
    let mean = origin + mean_offset;
    let std_dev = variance.sqrt();

    let high_confidence = scores.iter().filter(|score| **score >= HIGH_CONFIDENCE).count();
    let bonus = match high_confidence {
        n if n >= 4 => 20.0,
        3 => 10.0,
        _ => 0.0,
    };

    Agreement {
        score: ((100.0 - SPREAD_PENALTY * std_dev).max(0.0) + bonus).min(100.0),
        mean,
        std_dev,
        high_confidence,
    }
}

/// Cross-corpus agreement. Reads the primary signals produced earlier in the
/// run; a primary that has not run counts as zero.
pub struct AgreementProvider;

impl EvidenceProvider for AgreementProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::CrossCorpus
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        let primaries = SignalKind::primary();
        let scores = primaries.map(|kind| request.earlier_score(kind).unwrap_or(0.0));
        let agreement = agreement_score(&scores);

        let distribution: Map<String, Value> = primaries
            .iter()
            .zip(scores.iter())
            .map(|(kind, score)| (kind.name().to_string(), json!(score)))
            .collect();

        SignalReading::new(
            round_to(agreement.score, 2),
            json!({
                "method": "cross_corpus_validation",
                "average_score": round_to(agreement.mean, 2),
                "std_deviation": round_to(agreement.std_dev, 2),
                "agreement_score": round_to(agreement.score, 2),
                "high_confidence_sources": agreement.high_confidence,
                "score_distribution": distribution,
            }),
        )
    }
}
