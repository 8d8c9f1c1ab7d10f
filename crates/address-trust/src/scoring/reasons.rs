use crate::evidence::{Evidence, Finding, SignalKind};

pub const NO_IMPROVEMENTS: &str = "Address looks great! No improvements needed.";

fn score_of(evidence: &[Evidence], kind: SignalKind) -> f64 {
    evidence
        .iter()
        .find(|component| component.kind == kind)
        .map(|component| component.score)
        .unwrap_or(0.0)
}

fn has_finding(evidence: &[Evidence], predicate: impl Fn(&Finding) -> bool) -> bool {
    evidence
        .iter()
        .flat_map(|component| component.findings.iter())
        .any(predicate)
}

fn grid_locality(evidence: &[Evidence]) -> Option<&str> {
    evidence
        .iter()
        .flat_map(|component| component.findings.iter())
        .find_map(|finding| match finding {
            Finding::GridLocality { locality } => Some(locality.as_str()),
            _ => None,
        })
}

/// Deterministic, de-duplicated explanation codes in signal order.
pub fn reason_codes(evidence: &[Evidence]) -> Vec<String> {
    let score = |kind| score_of(evidence, kind);
    let cell_missing = has_finding(evidence, |finding| matches!(finding, Finding::CellNotInGrid));

    let geo = score(SignalKind::Geo);
    let temporal = score(SignalKind::Temporal);
    let iot = score(SignalKind::Iot);
    let doc = score(SignalKind::Doc);
    let crowd = score(SignalKind::Crowd);

    let mut codes: Vec<String> = Vec::new();
    let mut push = |code: &str| {
        if !codes.iter().any(|existing| existing == code) {
            codes.push(code.to_string());
        }
    };

    push(if geo >= 80.0 {
        "geo_exact_match"
    } else if geo >= 50.0 {
        "geo_partial_match"
    } else if cell_missing {
        "digipin_not_in_grid"
    } else {
        "geo_mismatch"
    });

    push(if temporal >= 70.0 {
        "delivery_history_found"
    } else if temporal > 0.0 {
        "limited_delivery_history"
    } else {
        "no_delivery_history"
    });

    push(if iot >= 60.0 {
        "iot_ping_active"
    } else if iot > 0.0 {
        "iot_ping_old"
    } else {
        "no_iot_signal"
    });

    push(if doc >= 60.0 {
        "documentary_match"
    } else {
        "limited_documentary_evidence"
    });

    push(if crowd >= 70.0 {
        "community_validated"
    } else if crowd > 0.0 {
        "partial_community_validation"
    } else {
        "no_community_validation"
    });

    if score(SignalKind::GeoPrecision) >= 80.0 {
        push("geo_precision_high");
    }
    if score(SignalKind::Linguistic) >= 70.0 {
        push("cultural_patterns_matched");
    }
    for finding in evidence.iter().flat_map(|component| component.findings.iter()) {
        if let Finding::Velocity { patterns, .. } = finding {
            for pattern in patterns {
                push(pattern.code());
            }
        }
    }
    if score(SignalKind::CrossCorpus) >= 80.0 {
        push("evidence_strong_agreement");
    }

    codes
}

/// Actionable hints for the weak signals, or a single all-clear message.
pub fn suggestions(evidence: &[Evidence]) -> Vec<String> {
    let score = |kind| score_of(evidence, kind);
    let mut hints = Vec::new();

    if score(SignalKind::Geo) < 70.0 {
        if has_finding(evidence, |finding| matches!(finding, Finding::CellNotInGrid)) {
            hints.push("Verify your grid cell code - it was not found in the reference grid".to_string());
        } else if let Some(locality) = grid_locality(evidence) {
            if !locality.trim().is_empty() {
                hints.push(format!("Did you mean: {locality}?"));
            }
            hints.push("Check for typos in locality name".to_string());
        }
    }

    if score(SignalKind::Temporal) < 50.0 {
        hints.push("Request a test delivery to establish address history".to_string());
    }
    if score(SignalKind::Iot) < 30.0 {
        hints.push("Enable location services on your device for IoT verification".to_string());
    }
    if score(SignalKind::Doc) < 50.0 {
        hints.push("Upload property tax receipt or utility bill for documentary proof".to_string());
    }
    if score(SignalKind::Crowd) < 40.0 {
        hints.push("Request verification from local postman or community validator".to_string());
    }
    if score(SignalKind::Linguistic) < 50.0 {
        hints.push("Include nearby landmarks (temple, school, shop) in your address".to_string());
    }

    if hints.is_empty() {
        hints.push(NO_IMPROVEMENTS.to_string());
    }
    hints
}
