//! Distance and location primitives over the reference grid.

mod precision;

pub use precision::{score_precision, PrecisionAssessment, PrecisionBreakdown};

use crate::corpus::ReferenceCorpora;
use crate::domain::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two decimal-degree points.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.long - a.long).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    haversine_km(a, b) * 1000.0
}

/// Ray-casting containment test. Points exactly on an edge may fall either
/// way; polygons with fewer than three vertices contain nothing.
pub fn point_in_polygon(point: Coordinate, polygon: &[Coordinate]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let (x, y) = (point.long, point.lat);
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].long, polygon[i].lat);
        let (xj, yj) = (polygon[j].long, polygon[j].lat);

        if (yi > y) != (yj > y) {
            let crossing = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < crossing {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Distance between a postal code's centroid and a grid cell's centroid,
/// `None` when either is unknown.
pub fn postal_cell_distance_km(
    corpora: &ReferenceCorpora,
    postal_code: &str,
    cell_id: &str,
) -> Option<f64> {
    let postal = corpora.postal_centroid(postal_code)?;
    let cell = corpora.cell_centroid(cell_id)?;
    Some(haversine_km(postal.position, cell))
}
