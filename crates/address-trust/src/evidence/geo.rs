use super::{EvidenceProvider, Finding, SignalKind, SignalReading, SignalRequest};
use crate::corpus::ReferenceCorpora;
use crate::domain::round_to;
use crate::geo::score_precision;
use serde_json::json;
use std::sync::Arc;

const NO_GRID_SCORE: f64 = 50.0;
const CELL_MISSING_SCORE: f64 = 20.0;
const LOCALITY_POINTS: f64 = 40.0;
const CITY_POINTS: f64 = 30.0;
const POSTAL_POINTS: f64 = 30.0;
/// Partial credit for a city that differs from the grid's.
const CITY_MISMATCH_CREDIT: f64 = 0.3;

/// Compares the declared locality, city and postal code with the reference
/// grid entry for the declared cell.
pub struct GeoMatchProvider {
    corpora: Arc<ReferenceCorpora>,
}

impl GeoMatchProvider {
    pub fn new(corpora: Arc<ReferenceCorpora>) -> Self {
        Self { corpora }
    }
}

impl EvidenceProvider for GeoMatchProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Geo
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        if !self.corpora.has_grid() {
            return SignalReading::new(
                NO_GRID_SCORE,
                json!({"method": "no_data", "message": "reference grid not loaded"}),
            );
        }

        let address = request.address;
        let Some(cell) = self.corpora.cell(&address.cell_id) else {
            return SignalReading::new(
                CELL_MISSING_SCORE,
                json!({"method": "digipin_not_found", "digipin": address.cell_id}),
            )
            .with_finding(Finding::CellNotInGrid);
        };

        let locality_similarity = strsim::normalized_levenshtein(
            &address.locality.trim().to_lowercase(),
            &cell.locality.trim().to_lowercase(),
        );
        let city_match = if address.city.trim().eq_ignore_ascii_case(cell.city.trim()) {
            1.0
        } else {
            CITY_MISMATCH_CREDIT
        };
        let postal_match = if address.postal_code.trim() == cell.postal_code.trim() {
            1.0
        } else {
            0.0
        };

        let locality = locality_similarity * LOCALITY_POINTS;
        let city = city_match * CITY_POINTS;
        let postal = postal_match * POSTAL_POINTS;

        SignalReading::new(
            round_to(locality + city + postal, 2),
            json!({
                "method": "digipin_matched",
                "matched": true,
                "grid_locality": cell.locality,
                "grid_city": cell.city,
                "grid_pin": cell.postal_code,
                "locality_similarity": round_to(locality_similarity * 100.0, 2),
                "score_breakdown": {
                    "locality": round_to(locality, 2),
                    "city": round_to(city, 2),
                    "pin": round_to(postal, 2),
                },
            }),
        )
        .with_finding(Finding::GridLocality {
            locality: cell.locality.clone(),
        })
    }
}

/// Four-level geospatial precision hierarchy.
pub struct GeoPrecisionProvider {
    corpora: Arc<ReferenceCorpora>,
}

impl GeoPrecisionProvider {
    pub fn new(corpora: Arc<ReferenceCorpora>) -> Self {
        Self { corpora }
    }
}

impl EvidenceProvider for GeoPrecisionProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::GeoPrecision
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        let assessment = score_precision(request.address, &self.corpora);
        let details = json!({
            "method": "precision_hierarchy",
            "postal_cell_distance_km": assessment.postal_cell_distance_km,
            "street_boundary_match": assessment.street_boundary_match,
            "house_range_valid": assessment.house_range_valid,
            "breakdown": assessment.breakdown,
        });

        let reading = SignalReading::new(assessment.score, details);
        match assessment.postal_cell_distance_km {
            Some(km) => reading.with_finding(Finding::PostalCellDistanceKm { km }),
            None => reading,
        }
    }
}
