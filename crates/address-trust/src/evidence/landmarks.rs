use super::{EvidenceProvider, SignalKind, SignalReading, SignalRequest};
use crate::corpus::ReferenceCorpora;
use crate::linguistic::analyze;
use serde_json::json;
use std::sync::Arc;

/// Landmark and proximity language, cross-checked against the cell's
/// landmark list.
pub struct LinguisticProvider {
    corpora: Arc<ReferenceCorpora>,
}

impl LinguisticProvider {
    pub fn new(corpora: Arc<ReferenceCorpora>) -> Self {
        Self { corpora }
    }
}

impl EvidenceProvider for LinguisticProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Linguistic
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        let landmarks = self.corpora.landmarks_for(&request.address.cell_id);
        let analysis = analyze(request.address, landmarks);

        SignalReading::new(
            analysis.score,
            json!({
                "method": "linguistic_patterns",
                "landmarks_found": analysis.mentions,
                "proximity_patterns": analysis.proximity_phrases,
                "corpus_matches": analysis.matched_landmarks,
                "corpus_size": landmarks.len(),
                "score_breakdown": analysis.breakdown,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Landmark;
    use crate::domain::Address;
    use chrono::NaiveDate;

    #[test]
    fn scores_landmark_language_against_cell_corpus() {
        let mut corpora = ReferenceCorpora::default();
        corpora.insert_landmark("TS-1", Landmark::new("temple", "Paramekkavu Temple"));
        let provider = LinguisticProvider::new(Arc::new(corpora));

        let address = Address {
            street: "Behind Paramekkavu Temple".to_string(),
            city: "Thrissur".to_string(),
            cell_id: "TS-1".to_string(),
            ..Address::default()
        };
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 1)
            .expect("date")
            .and_hms_opt(0, 0, 0)
            .expect("time");
        let reading = provider.score(&SignalRequest {
            address: &address,
            as_of,
            earlier: &[],
        });

        // two mentions (50) + one phrase (15) + one corpus match (25)
        assert_eq!(reading.score, 90.0);
        assert_eq!(reading.details["corpus_size"], 1);
        assert_eq!(reading.details["corpus_matches"][0], "temple:paramekkavu temple");
    }
}
