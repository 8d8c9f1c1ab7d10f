use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::corpus::{GridCell, Landmark, PostalCentroid, ReferenceCorpora};
use crate::domain::{Address, Coordinate};
use crate::scoring::{ScoringConfig, ScoringEngine};

pub(super) const STRONG_CELL: &str = "TS-6800-01-XX";
pub(super) const VELOCITY_CELL: &str = "FR-1111-11-ZZ";
pub(super) const UNKNOWN_CELL: &str = "XX-9999-99-99";

pub(super) fn as_of() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .expect("valid date")
        .and_hms_opt(12, 0, 0)
        .expect("valid time")
}

fn days_ago(days: i64) -> NaiveDateTime {
    as_of() - Duration::days(days)
}

pub(super) fn corpora() -> Arc<ReferenceCorpora> {
    let round_south = Coordinate::new(10.5276, 76.2144);
    let mut corpora = ReferenceCorpora::default();

    corpora.insert_cell(
        STRONG_CELL,
        GridCell {
            locality: "Round South".to_string(),
            city: "Thrissur".to_string(),
            postal_code: "680001".to_string(),
            centroid: Some(round_south),
        },
    );
    corpora.insert_cell(
        VELOCITY_CELL,
        GridCell {
            locality: "Ayyanthole".to_string(),
            city: "Thrissur".to_string(),
            postal_code: "680003".to_string(),
            centroid: Some(Coordinate::new(10.5310, 76.1950)),
        },
    );
    corpora.insert_postal_centroid(
        "680001",
        PostalCentroid {
            position: round_south,
            district: "Thrissur".to_string(),
            state: "Kerala".to_string(),
        },
    );

    for days in [2, 10, 25, 60] {
        corpora.record_delivery(STRONG_CELL, days_ago(days));
    }
    for days in [0, 0, 0, 1, 1, 2, 3, 3, 4, 4, 5, 5] {
        corpora.record_delivery(VELOCITY_CELL, days_ago(days));
    }

    corpora.record_ping(STRONG_CELL, days_ago(40));
    corpora.record_ping(STRONG_CELL, days_ago(3));

    corpora.insert_landmark(STRONG_CELL, Landmark::new("temple", "Vadakkunnathan Temple"));
    corpora.insert_landmark(STRONG_CELL, Landmark::new("school", "Model Boys School"));

    Arc::new(corpora)
}

pub(super) fn engine() -> ScoringEngine {
    ScoringEngine::new(ScoringConfig::default(), corpora())
}

pub(super) fn strong_address() -> Address {
    Address {
        house_number: "12".to_string(),
        street: "Near Vadakkunnathan Temple".to_string(),
        locality: "Round South".to_string(),
        city: "Thrissur".to_string(),
        district: "Thrissur".to_string(),
        state: "Kerala".to_string(),
        postal_code: "680001".to_string(),
        cell_id: STRONG_CELL.to_string(),
    }
}

pub(super) fn velocity_address() -> Address {
    Address {
        house_number: "3".to_string(),
        street: "Ayyanthole Road".to_string(),
        locality: "Ayyanthole".to_string(),
        city: "Thrissur".to_string(),
        district: "Thrissur".to_string(),
        state: "Kerala".to_string(),
        postal_code: "680003".to_string(),
        cell_id: VELOCITY_CELL.to_string(),
    }
}

pub(super) fn unknown_cell_address() -> Address {
    Address {
        house_number: String::new(),
        street: String::new(),
        locality: "Olavakkode".to_string(),
        city: "Palakkad".to_string(),
        district: "Palakkad".to_string(),
        state: "Kerala".to_string(),
        postal_code: "678002".to_string(),
        cell_id: UNKNOWN_CELL.to_string(),
    }
}
