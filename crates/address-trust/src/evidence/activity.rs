use super::{days_between, EvidenceProvider, Finding, FraudPattern, SignalKind, SignalReading, SignalRequest};
use crate::corpus::ReferenceCorpora;
use crate::domain::round_to;
use serde_json::json;
use std::sync::Arc;

const DECAY_POINTS_PER_DELIVERY: f64 = 20.0;
const DECAY_RATE: f64 = 0.9;
const DECAY_CAP: f64 = 100.0;

const WEEKLY_VELOCITY_LIMIT: usize = 10;
const WEEKLY_VELOCITY_PENALTY: f64 = -30.0;
const DAILY_VELOCITY_LIMIT: usize = 5;
const DAILY_VELOCITY_PENALTY: f64 = -40.0;

/// Step score from delivery counts over the trailing 30 and 90 days.
pub struct DeliveryHistoryProvider {
    corpora: Arc<ReferenceCorpora>,
}

impl DeliveryHistoryProvider {
    pub fn new(corpora: Arc<ReferenceCorpora>) -> Self {
        Self { corpora }
    }
}

impl EvidenceProvider for DeliveryHistoryProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Temporal
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        if !self.corpora.has_deliveries() {
            return SignalReading::new(
                0.0,
                json!({"method": "no_data", "message": "no delivery logs loaded"}),
            );
        }

        let cell_id = &request.address.cell_id;
        let deliveries = self.corpora.deliveries_for(cell_id);
        if deliveries.is_empty() {
            return SignalReading::new(0.0, json!({"method": "no_deliveries", "digipin": cell_id}));
        }

        let ages: Vec<i64> = deliveries
            .iter()
            .map(|at| days_between(*at, request.as_of))
            .collect();
        let last_30 = ages.iter().filter(|age| **age <= 30).count();
        let last_90 = ages.iter().filter(|age| **age <= 90).count();

        let score = match (last_30, last_90) {
            (n, _) if n >= 3 => 100.0,
            (n, _) if n >= 1 => 70.0,
            (_, n) if n >= 2 => 50.0,
            (_, n) if n >= 1 => 30.0,
            _ => 10.0,
        };

        SignalReading::new(
            score,
            json!({
                "method": "delivery_history",
                "total_deliveries": deliveries.len(),
                "deliveries_30_days": last_30,
                "deliveries_90_days": last_90,
                "most_recent": deliveries.iter().max().map(|at| at.to_string()),
            }),
        )
    }
}

/// Exponentially decayed delivery recency with a velocity-based fraud penalty.
pub struct DeliveryDecayProvider {
    corpora: Arc<ReferenceCorpora>,
}

impl DeliveryDecayProvider {
    pub fn new(corpora: Arc<ReferenceCorpora>) -> Self {
        Self { corpora }
    }
}

impl EvidenceProvider for DeliveryDecayProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::TemporalDecay
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        if !self.corpora.has_deliveries() {
            return SignalReading::new(
                0.0,
                json!({"method": "no_data", "message": "no delivery logs loaded"}),
            );
        }

        let cell_id = &request.address.cell_id;
        let deliveries = self.corpora.deliveries_for(cell_id);
        if deliveries.is_empty() {
            return SignalReading::new(0.0, json!({"method": "no_deliveries", "digipin": cell_id}));
        }

        let ages: Vec<i64> = deliveries
            .iter()
            .map(|at| days_between(*at, request.as_of).max(0))
            .collect();

        let decay_score = ages
            .iter()
            .map(|age| DECAY_POINTS_PER_DELIVERY * DECAY_RATE.powi(clamp_exponent(*age)))
            .sum::<f64>()
            .min(DECAY_CAP);

        let velocity_7d = ages.iter().filter(|age| **age <= 7).count();
        let velocity_1d = ages.iter().filter(|age| **age <= 1).count();

        let mut penalty = 0.0;
        let mut patterns = Vec::new();
        if velocity_7d >= WEEKLY_VELOCITY_LIMIT {
            penalty = WEEKLY_VELOCITY_PENALTY;
            patterns.push(FraudPattern::ExcessiveVelocity7d);
        }
        if velocity_1d >= DAILY_VELOCITY_LIMIT {
            penalty = DAILY_VELOCITY_PENALTY;
            patterns.push(FraudPattern::SuspiciousVelocity1d);
        }

        let final_score = round_to((decay_score + penalty).max(0.0), 2);
        let pattern_codes: Vec<&str> = patterns.iter().map(|pattern| pattern.code()).collect();

        SignalReading::new(
            final_score,
            json!({
                "method": "temporal_decay",
                "total_deliveries": deliveries.len(),
                "most_recent": deliveries.iter().max().map(|at| at.to_string()),
                "decay_score": round_to(decay_score, 2),
                "fraud_adjustment": penalty,
                "suspicious_patterns": pattern_codes,
                "velocity_7d": velocity_7d,
                "velocity_1d": velocity_1d,
            }),
        )
        .with_finding(Finding::Velocity { penalty, patterns })
    }
}

fn clamp_exponent(age_days: i64) -> i32 {
    i32::try_from(age_days).unwrap_or(i32::MAX)
}

/// Step score from the age of the most recent device ping in the cell.
pub struct DevicePresenceProvider {
    corpora: Arc<ReferenceCorpora>,
}

impl DevicePresenceProvider {
    pub fn new(corpora: Arc<ReferenceCorpora>) -> Self {
        Self { corpora }
    }
}

impl EvidenceProvider for DevicePresenceProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Iot
    }

    fn score(&self, request: &SignalRequest<'_>) -> SignalReading {
        if !self.corpora.has_pings() {
            return SignalReading::new(
                0.0,
                json!({"method": "no_data", "message": "no device ping logs loaded"}),
            );
        }

        let cell_id = &request.address.cell_id;
        let Some(last_ping) = self.corpora.pings_for(cell_id).iter().max().copied() else {
            return SignalReading::new(0.0, json!({"method": "no_pings", "digipin": cell_id}));
        };

        let days_since = days_between(last_ping, request.as_of);
        let (score, recency) = match days_since {
            d if d <= 7 => (100.0, "very_recent"),
            d if d <= 30 => (60.0, "recent"),
            d if d <= 90 => (30.0, "old"),
            _ => (10.0, "very_old"),
        };

        SignalReading::new(
            score,
            json!({
                "method": "iot_ping",
                "last_ping": last_ping.to_string(),
                "days_since_ping": days_since,
                "recency": recency,
                "ping_count": self.corpora.pings_for(cell_id).len(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .expect("date")
            .and_hms_opt(12, 0, 0)
            .expect("time")
    }

    fn with_deliveries(days_ago: &[i64]) -> Arc<ReferenceCorpora> {
        let mut corpora = ReferenceCorpora::default();
        for days in days_ago {
            corpora.record_delivery("BG-1", now() - Duration::days(*days));
        }
        corpora.record_delivery("OTHER", now());
        Arc::new(corpora)
    }

    fn read(provider: &dyn EvidenceProvider, cell: &str) -> SignalReading {
        let address = Address {
            cell_id: cell.to_string(),
            ..Address::default()
        };
        provider.score(&SignalRequest {
            address: &address,
            as_of: now(),
            earlier: &[],
        })
    }

    #[test]
    fn delivery_history_follows_step_ladder() {
        let cases: [(&[i64], f64); 5] = [
            (&[1, 5, 20], 100.0),
            (&[10], 70.0),
            (&[45, 80], 50.0),
            (&[60], 30.0),
            (&[200, 365], 10.0),
        ];
        for (days, expected) in cases {
            let reading = read(&DeliveryHistoryProvider::new(with_deliveries(days)), "BG-1");
            assert_eq!(reading.score, expected, "deliveries {days:?} days ago");
        }
    }

    #[test]
    fn delivery_history_distinguishes_missing_cell_from_missing_logs() {
        let reading = read(&DeliveryHistoryProvider::new(with_deliveries(&[1])), "BG-2");
        assert_eq!(reading.details["method"], "no_deliveries");

        let empty = read(
            &DeliveryHistoryProvider::new(Arc::new(ReferenceCorpora::default())),
            "BG-1",
        );
        assert_eq!(empty.score, 0.0);
        assert_eq!(empty.details["method"], "no_data");
    }

    #[test]
    fn decay_sums_recency_weighted_points() {
        let reading = read(&DeliveryDecayProvider::new(with_deliveries(&[0, 1])), "BG-1");
        // 20 + 18
        assert_eq!(reading.score, 38.0);
        assert_eq!(
            reading.findings,
            vec![Finding::Velocity {
                penalty: 0.0,
                patterns: vec![]
            }]
        );
    }

    #[test]
    fn weekly_velocity_costs_thirty_points() {
        let days: Vec<i64> = (0..10).map(|i| 2 + i % 5).collect();
        let reading = read(&DeliveryDecayProvider::new(with_deliveries(&days)), "BG-1");
        assert_eq!(reading.details["fraud_adjustment"], -30.0);
        assert_eq!(reading.details["suspicious_patterns"], json!(["excessive_velocity_7d"]));
    }

    #[test]
    fn daily_velocity_overrides_weekly_penalty() {
        let days = [0, 0, 0, 1, 1, 2, 3, 3, 4, 4, 5, 5];
        let reading = read(&DeliveryDecayProvider::new(with_deliveries(&days)), "BG-1");

        assert_eq!(reading.details["decay_score"], 100.0);
        assert_eq!(reading.score, 60.0);
        assert_eq!(
            reading.findings,
            vec![Finding::Velocity {
                penalty: -40.0,
                patterns: vec![
                    FraudPattern::ExcessiveVelocity7d,
                    FraudPattern::SuspiciousVelocity1d
                ],
            }]
        );
    }

    #[test]
    fn future_deliveries_count_as_today() {
        let reading = read(&DeliveryDecayProvider::new(with_deliveries(&[-3])), "BG-1");
        assert_eq!(reading.score, 20.0);
    }

    #[test]
    fn device_presence_uses_latest_ping() {
        let mut corpora = ReferenceCorpora::default();
        corpora.record_ping("BG-1", now() - Duration::days(120));
        corpora.record_ping("BG-1", now() - Duration::days(20));
        let reading = read(&DevicePresenceProvider::new(Arc::new(corpora)), "BG-1");

        assert_eq!(reading.score, 60.0);
        assert_eq!(reading.details["recency"], "recent");
        assert_eq!(reading.details["ping_count"], 2);
    }

    #[test]
    fn device_presence_without_pings_scores_zero() {
        let mut corpora = ReferenceCorpora::default();
        corpora.record_ping("BG-9", now());
        let reading = read(&DevicePresenceProvider::new(Arc::new(corpora)), "BG-1");
        assert_eq!(reading.score, 0.0);
        assert_eq!(reading.details["method"], "no_pings");
    }
}
