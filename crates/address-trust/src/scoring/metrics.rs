use crate::domain::round_to;
use crate::evidence::{Evidence, Finding};
use serde::Serialize;

/// Assumed spread of ACS within a category when estimating percentiles.
const CATEGORY_STD_DEV: f64 = 15.0;
const URBAN_CITIES: [&str; 5] = ["thrissur", "delhi", "mumbai", "bangalore", "chennai"];
const URBAN_AVERAGE: f64 = 78.5;
const RURAL_AVERAGE: f64 = 62.3;

const UNKNOWN_POSITION_METERS: u32 = 500;
const MIN_POSITION_METERS: u32 = 20;
const MAX_POSITION_METERS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudRisk {
    pub risk_percentage: f64,
    pub risk_level: RiskLevel,
    pub suspicious_patterns: Vec<String>,
    /// Penalty the decay signal applied for delivery velocity (zero or negative).
    pub velocity_score: f64,
}

/// Where a result is routed next, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPath {
    FraudQueue,
    AutoToken,
    #[serde(rename = "iot_check")]
    DeviceCheck,
    CrowdValidation,
    PostmanQueue,
}

impl EscalationPath {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FraudQueue => "fraud_queue",
            Self::AutoToken => "auto_token",
            Self::DeviceCheck => "iot_check",
            Self::CrowdValidation => "crowd_validation",
            Self::PostmanQueue => "postman_queue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryComparison {
    pub category: String,
    pub average_acs: f64,
    pub difference: f64,
    pub percentile: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvancedMetrics {
    pub fraud_risk: FraudRisk,
    pub position_confidence_meters: u32,
    pub escalation_path: EscalationPath,
    pub address_fingerprint: String,
    pub category_avg_comparison: CategoryComparison,
}

impl AdvancedMetrics {
    pub fn compute(acs: f64, city: &str, fingerprint: String, evidence: &[Evidence]) -> Self {
        let fraud_risk = assess_fraud_risk(acs, evidence);
        let escalation_path = escalation_path(acs, fraud_risk.risk_percentage);

        Self {
            position_confidence_meters: position_confidence(acs, postal_cell_distance(evidence)),
            escalation_path,
            fraud_risk,
            address_fingerprint: fingerprint,
            category_avg_comparison: category_comparison(city, acs),
        }
    }
}

fn findings(evidence: &[Evidence]) -> impl Iterator<Item = &Finding> {
    evidence.iter().flat_map(|component| component.findings.iter())
}

fn postal_cell_distance(evidence: &[Evidence]) -> Option<f64> {
    findings(evidence).find_map(|finding| match finding {
        Finding::PostalCellDistanceKm { km } => Some(*km),
        _ => None,
    })
}

pub fn assess_fraud_risk(acs: f64, evidence: &[Evidence]) -> FraudRisk {
    let (velocity_score, patterns) = findings(evidence)
        .find_map(|finding| match finding {
            Finding::Velocity { penalty, patterns } => Some((*penalty, patterns.clone())),
            _ => None,
        })
        .unwrap_or((0.0, Vec::new()));

    let (risk_percentage, risk_level) = if !patterns.is_empty() {
        ((60.0 + 20.0 * patterns.len() as f64).min(100.0), RiskLevel::High)
    } else if acs < 40.0 {
        (30.0, RiskLevel::Medium)
    } else if acs < 65.0 {
        (10.0, RiskLevel::Low)
    } else {
        (2.0, RiskLevel::Low)
    };

    FraudRisk {
        risk_percentage,
        risk_level,
        suspicious_patterns: patterns.iter().map(|pattern| pattern.code().to_string()).collect(),
        velocity_score,
    }
}

/// Radius in metres within which the address is believed to lie.
pub fn position_confidence(acs: f64, postal_cell_km: Option<f64>) -> u32 {
    let Some(km) = postal_cell_km else {
        return UNKNOWN_POSITION_METERS;
    };

    let base = (km * 200.0).trunc();
    let multiplier = if acs >= 85.0 {
        0.5
    } else if acs >= 65.0 {
        1.0
    } else if acs >= 40.0 {
        2.0
    } else {
        3.0
    };

    let meters = (base * multiplier)
        .trunc()
        .clamp(MIN_POSITION_METERS as f64, MAX_POSITION_METERS as f64);
    meters as u32
}

pub fn escalation_path(acs: f64, fraud_risk_percentage: f64) -> EscalationPath {
    if fraud_risk_percentage >= 60.0 {
        EscalationPath::FraudQueue
    } else if acs >= 85.0 {
        EscalationPath::AutoToken
    } else if acs >= 65.0 {
        EscalationPath::DeviceCheck
    } else if acs >= 40.0 {
        EscalationPath::CrowdValidation
    } else {
        EscalationPath::PostmanQueue
    }
}

pub fn category_comparison(city: &str, acs: f64) -> CategoryComparison {
    let city = city.trim().to_lowercase();
    let (category, average_acs) = if URBAN_CITIES.contains(&city.as_str()) {
        ("Urban", URBAN_AVERAGE)
    } else {
        ("Suburban/Rural", RURAL_AVERAGE)
    };

    CategoryComparison {
        category: category.to_string(),
        average_acs,
        difference: round_to(acs - average_acs, 2),
        percentile: percentile(acs, average_acs),
    }
}

fn percentile(acs: f64, average: f64) -> u8 {
    let z = (acs - average) / CATEGORY_STD_DEV;
    match z {
        z if z >= 2.0 => 98,
        z if z >= 1.5 => 93,
        z if z >= 1.0 => 84,
        z if z >= 0.5 => 69,
        z if z >= 0.0 => 50,
        z if z >= -0.5 => 31,
        z if z >= -1.0 => 16,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{FraudPattern, SignalKind, SignalReading};
    use serde_json::Value;

    fn decay_evidence(penalty: f64, patterns: Vec<FraudPattern>) -> Vec<Evidence> {
        let reading = SignalReading::new(10.0, Value::Null)
            .with_finding(Finding::Velocity { penalty, patterns });
        vec![Evidence::from_reading(SignalKind::TemporalDecay, reading, 0.05)]
    }

    #[test]
    fn fraud_patterns_dominate_risk() {
        let evidence = decay_evidence(
            -40.0,
            vec![FraudPattern::ExcessiveVelocity7d, FraudPattern::SuspiciousVelocity1d],
        );
        let risk = assess_fraud_risk(90.0, &evidence);
        assert_eq!(risk.risk_percentage, 100.0);
        assert_eq!(risk.risk_level, RiskLevel::High);
        assert_eq!(risk.velocity_score, -40.0);
        assert_eq!(
            risk.suspicious_patterns,
            vec!["excessive_velocity_7d", "suspicious_velocity_1d"]
        );

        let single = assess_fraud_risk(90.0, &decay_evidence(-30.0, vec![FraudPattern::ExcessiveVelocity7d]));
        assert_eq!(single.risk_percentage, 80.0);
    }

    #[test]
    fn fraud_risk_without_patterns_follows_acs_band() {
        assert_eq!(assess_fraud_risk(39.9, &[]).risk_level, RiskLevel::Medium);
        assert_eq!(assess_fraud_risk(39.9, &[]).risk_percentage, 30.0);
        assert_eq!(assess_fraud_risk(50.0, &[]).risk_percentage, 10.0);
        assert_eq!(assess_fraud_risk(65.0, &[]).risk_percentage, 2.0);
        assert_eq!(assess_fraud_risk(65.0, &[]).velocity_score, 0.0);
    }

    #[test]
    fn position_confidence_scales_by_acs_band() {
        assert_eq!(position_confidence(90.0, None), 500);
        // 2.5 km -> 500 m base
        assert_eq!(position_confidence(90.0, Some(2.5)), 250);
        assert_eq!(position_confidence(70.0, Some(2.5)), 500);
        assert_eq!(position_confidence(50.0, Some(2.5)), 1000);
        assert_eq!(position_confidence(10.0, Some(2.5)), 1000);
        assert_eq!(position_confidence(90.0, Some(0.0)), 20);
    }

    #[test]
    fn escalation_prioritises_fraud() {
        assert_eq!(escalation_path(95.0, 80.0), EscalationPath::FraudQueue);
        assert_eq!(escalation_path(85.0, 2.0), EscalationPath::AutoToken);
        assert_eq!(escalation_path(65.0, 2.0), EscalationPath::DeviceCheck);
        assert_eq!(escalation_path(40.0, 10.0), EscalationPath::CrowdValidation);
        assert_eq!(escalation_path(39.0, 30.0), EscalationPath::PostmanQueue);
        assert_eq!(
            serde_json::to_value(EscalationPath::DeviceCheck).expect("serializes"),
            "iot_check"
        );
    }

    #[test]
    fn category_comparison_uses_city_class() {
        let urban = category_comparison(" Chennai ", 93.5);
        assert_eq!(urban.category, "Urban");
        assert_eq!(urban.difference, 15.0);
        assert_eq!(urban.percentile, 84);

        let rural = category_comparison("Palakkad", 40.0);
        assert_eq!(rural.category, "Suburban/Rural");
        assert_eq!(rural.average_acs, 62.3);
        assert_eq!(rural.percentile, 5);
    }

    #[test]
    fn metrics_read_distance_from_findings() {
        let reading = SignalReading::new(70.0, Value::Null)
            .with_finding(Finding::PostalCellDistanceKm { km: 1.0 });
        let evidence = vec![Evidence::from_reading(SignalKind::GeoPrecision, reading, 0.05)];

        let metrics = AdvancedMetrics::compute(70.0, "Delhi", "abc".to_string(), &evidence);
        assert_eq!(metrics.position_confidence_meters, 200);
        assert_eq!(metrics.escalation_path, EscalationPath::DeviceCheck);
        assert_eq!(metrics.address_fingerprint, "abc");
    }
}
