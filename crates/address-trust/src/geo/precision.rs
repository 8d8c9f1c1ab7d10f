use super::postal_cell_distance_km;
use crate::corpus::ReferenceCorpora;
use crate::domain::{round_to, Address};
use serde::Serialize;

const POSTAL_CELL_WEIGHT: f64 = 0.30;
const BOUNDARY_WEIGHT: f64 = 0.25;
const HOUSE_RANGE_WEIGHT: f64 = 0.20;
const LANDMARK_WEIGHT: f64 = 0.15;

/// Distance at which postal/cell alignment scores zero.
const POSTAL_CELL_TOLERANCE_KM: f64 = 5.0;
const NEUTRAL: f64 = 50.0;

/// Sub-scores of the four-level precision hierarchy, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrecisionBreakdown {
    pub postal_cell: f64,
    pub boundary: f64,
    pub house_range: f64,
    pub landmark: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecisionAssessment {
    pub score: f64,
    pub breakdown: PrecisionBreakdown,
    pub postal_cell_distance_km: Option<f64>,
    pub street_boundary_match: bool,
    pub house_range_valid: bool,
}

/// Scores how precisely the address can be placed.
///
/// Levels 2 (street boundary) and 4 (landmark proximity) approximate their
/// checks from grid membership: no boundary dataset exists, so a real polygon
/// test would have nothing to test against. Missing reference data falls back
/// to neutral sub-scores rather than zero.
pub fn score_precision(address: &Address, corpora: &ReferenceCorpora) -> PrecisionAssessment {
    let distance = postal_cell_distance_km(corpora, &address.postal_code, &address.cell_id);
    let postal_cell = match distance {
        Some(km) => (100.0 - km / POSTAL_CELL_TOLERANCE_KM * 100.0).max(0.0),
        None => NEUTRAL,
    };

    let cell_located = corpora.cell_centroid(&address.cell_id).is_some();
    let street_boundary_match = cell_located && !address.street.trim().is_empty();
    let boundary = if street_boundary_match { 75.0 } else { NEUTRAL };

    let (house_range, house_range_valid) = house_number_plausibility(&address.house_number);

    let landmark = if cell_located { 70.0 } else { 30.0 };

    let score = postal_cell * POSTAL_CELL_WEIGHT
        + boundary * BOUNDARY_WEIGHT
        + house_range * HOUSE_RANGE_WEIGHT
        + landmark * LANDMARK_WEIGHT;

    PrecisionAssessment {
        score: round_to(score, 2),
        breakdown: PrecisionBreakdown {
            postal_cell,
            boundary,
            house_range,
            landmark,
        },
        postal_cell_distance_km: distance.map(|km| round_to(km, 2)),
        street_boundary_match,
        house_range_valid,
    }
}

fn house_number_plausibility(house_number: &str) -> (f64, bool) {
    let digits: String = house_number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return (NEUTRAL, false);
    }

    match digits.parse::<u64>() {
        Ok(number) if (1..=999).contains(&number) => (80.0, true),
        _ => (40.0, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{GridCell, PostalCentroid};
    use crate::domain::Coordinate;

    fn corpora_with(cell_at: Coordinate, postal_at: Coordinate) -> ReferenceCorpora {
        let mut corpora = ReferenceCorpora::default();
        corpora.insert_cell(
            "TS-1",
            GridCell {
                locality: "Round South".to_string(),
                city: "Thrissur".to_string(),
                postal_code: "680001".to_string(),
                centroid: Some(cell_at),
            },
        );
        corpora.insert_postal_centroid(
            "680001",
            PostalCentroid {
                position: postal_at,
                district: "Thrissur".to_string(),
                state: "Kerala".to_string(),
            },
        );
        corpora
    }

    fn address(house: &str, street: &str) -> Address {
        Address {
            house_number: house.to_string(),
            street: street.to_string(),
            postal_code: "680001".to_string(),
            cell_id: "TS-1".to_string(),
            ..Address::default()
        }
    }

    #[test]
    fn aligned_centroids_score_full_level_one() {
        let point = Coordinate::new(10.5276, 76.2144);
        let assessment = score_precision(&address("12/4", "Temple Road"), &corpora_with(point, point));

        assert_eq!(assessment.breakdown.postal_cell, 100.0);
        assert_eq!(assessment.breakdown.boundary, 75.0);
        assert_eq!(assessment.breakdown.house_range, 80.0);
        assert_eq!(assessment.breakdown.landmark, 70.0);
        // 30 + 18.75 + 16 + 10.5
        assert_eq!(assessment.score, 75.25);
        assert_eq!(assessment.postal_cell_distance_km, Some(0.0));
    }

    #[test]
    fn distant_centroids_floor_level_one_at_zero() {
        let cell = Coordinate::new(10.5276, 76.2144);
        let far = Coordinate::new(10.6276, 76.2144);
        let assessment = score_precision(&address("5", "Temple Road"), &corpora_with(cell, far));

        assert_eq!(assessment.breakdown.postal_cell, 0.0);
        assert!(assessment.postal_cell_distance_km.expect("distance") > 5.0);
    }

    #[test]
    fn missing_reference_data_defaults_to_neutral() {
        let assessment = score_precision(&address("", ""), &ReferenceCorpora::default());

        assert_eq!(assessment.breakdown.postal_cell, 50.0);
        assert_eq!(assessment.breakdown.boundary, 50.0);
        assert_eq!(assessment.breakdown.house_range, 50.0);
        assert_eq!(assessment.breakdown.landmark, 30.0);
        assert!(assessment.postal_cell_distance_km.is_none());
        assert!(assessment.score > 0.0);
    }

    #[test]
    fn house_numbers_outside_range_are_penalised() {
        assert_eq!(house_number_plausibility("1200"), (40.0, false));
        assert_eq!(house_number_plausibility("0"), (40.0, false));
        assert_eq!(house_number_plausibility("Flat B"), (50.0, false));
        assert_eq!(house_number_plausibility("99999999999999999999999"), (40.0, false));
        assert_eq!(house_number_plausibility("No. 7A"), (80.0, true));
    }
}
