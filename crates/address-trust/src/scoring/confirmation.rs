use crate::domain::{round_to, ValidationLevel};
use crate::evidence::{Evidence, SignalKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Validators recorded on the crowd signal once a human confirms the address.
pub const CONFIRMERS: [&str; 5] = ["postman", "admin", "kirana_store", "neighbor", "delivery_agent"];

/// Human-in-the-loop confirmation supplied by an administrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    /// A postman or administrator has physically confirmed the address.
    pub confirmed: bool,
    /// Administrator-assigned level replacing the derived one.
    #[serde(default)]
    pub mark_vl: Option<ValidationLevel>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Forces the crowd component to full confidence and recomputes the weighted
/// sum. The result never drops below `current_acs`; an unchanged score below 99
/// is nudged up by one point.
pub(crate) fn boost(current_acs: f64, evidence: &mut [Evidence]) -> f64 {
    for component in evidence
        .iter_mut()
        .filter(|component| component.kind == SignalKind::Crowd)
    {
        component.score = 100.0;
        match &mut component.details {
            Value::Object(details) => {
                details.insert("confirmations".to_string(), json!(CONFIRMERS.len()));
                details.insert("validators".to_string(), json!(CONFIRMERS));
            }
            other => {
                *other = json!({
                    "method": "admin_confirmation",
                    "confirmations": CONFIRMERS.len(),
                    "validators": CONFIRMERS,
                });
            }
        }
    }

    let recomputed: f64 = evidence
        .iter()
        .map(|component| component.score * component.weight)
        .sum();

    let mut boosted = recomputed.max(current_acs);
    if boosted == current_acs && boosted < 99.0 {
        boosted += 1.0;
    }

    round_to(boosted.min(100.0), 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::SignalReading;

    fn components(crowd: f64) -> Vec<Evidence> {
        vec![
            Evidence::from_reading(SignalKind::Geo, SignalReading::new(80.0, json!({})), 0.5),
            Evidence::from_reading(
                SignalKind::Crowd,
                SignalReading::new(crowd, json!({"method": "crowd_validation", "confirmations": 0})),
                0.5,
            ),
        ]
    }

    #[test]
    fn boost_recomputes_weighted_sum() {
        let mut evidence = components(0.0);
        let boosted = boost(40.0, &mut evidence);

        assert_eq!(boosted, 90.0);
        assert_eq!(evidence[1].score, 100.0);
        assert_eq!(evidence[1].details["confirmations"], 5);
        assert_eq!(evidence[1].details["method"], "crowd_validation");
        assert_eq!(evidence[1].details["validators"][1], "admin");
    }

    #[test]
    fn boost_never_lowers_the_score() {
        let mut evidence = components(100.0);
        // recomputed 90 is below the stored 93, so the stored score holds and gets a nudge
        assert_eq!(boost(93.0, &mut evidence), 94.0);
    }

    #[test]
    fn boost_stops_nudging_near_the_ceiling() {
        let mut evidence = components(100.0);
        assert_eq!(boost(99.5, &mut evidence), 99.5);
    }

    #[test]
    fn non_object_details_are_replaced() {
        let mut evidence = vec![Evidence::from_reading(
            SignalKind::Crowd,
            SignalReading::new(0.0, Value::Null),
            1.0,
        )];
        assert_eq!(boost(10.0, &mut evidence), 100.0);
        assert_eq!(evidence[0].details["method"], "admin_confirmation");
    }
}
