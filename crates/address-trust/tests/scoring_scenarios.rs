use std::io::Cursor;
use std::sync::Arc;

use address_trust::calibration::{
    load_ground_truth, predict, AccuracyEvaluator, OptimizerSettings, Strategy, WeightOptimizer,
};
use address_trust::corpus::{ReferenceCorpora, DELIVERY_FILE, GRID_FILE, LANDMARK_FILE, PING_FILE};
use address_trust::evidence::{
    agreement_score, AgreementProvider, Evidence, EvidenceProvider, SignalKind, SignalReading,
    SignalRequest,
};
use address_trust::scoring::{EscalationPath, RiskLevel, ScoringConfig, WeightVector, WEIGHT_TOLERANCE};
use address_trust::{Address, ScoringEngine, ValidationLevel};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

const GRID: &str = "\
digipin,locality,city,pin,lat,long
TS-6800-01-XX,Round South,Thrissur,680001,10.5276,76.2144
FR-1111-11-ZZ,Ayyanthole,Thrissur,680003,10.5160,76.2010
";

const DELIVERIES: &str = "\
digipin,delivery_date
TS-6800-01-XX,2025-05-30
TS-6800-01-XX,2025-05-22 09:30:00
TS-6800-01-XX,2025-04-02T14:00:00
FR-1111-11-ZZ,2025-06-01
FR-1111-11-ZZ,2025-06-01
FR-1111-11-ZZ,2025-06-01
FR-1111-11-ZZ,2025-05-31
FR-1111-11-ZZ,2025-05-31
FR-1111-11-ZZ,2025-05-31
FR-1111-11-ZZ,2025-05-30
FR-1111-11-ZZ,2025-05-30
FR-1111-11-ZZ,2025-05-29
FR-1111-11-ZZ,2025-05-29
FR-1111-11-ZZ,2025-05-28
FR-1111-11-ZZ,2025-05-27
FR-1111-11-ZZ,not-a-date
";

const PINGS: &str = "\
digipin,last_ping
TS-6800-01-XX,2025-05-31T08:00:00Z
";

const LANDMARKS: &str = "\
digipin,landmark_type,landmark_name,lat,long
TS-6800-01-XX,temple,Vadakkunnathan Temple,10.5276,76.2144
TS-6800-01-XX,school,Model Boys School,,
";

const POSTAL: &str = "\
pin,lat,long,district,state
680001,10.5276,76.2144,Thrissur,Kerala
680003,10.5160,76.2010,Thrissur,Kerala
";

const GROUND_TRUTH: &str = "\
test_id,house_no,street,locality,city,district,state,pin,digipin,verified_acs,verified_vl,verified_lat,verified_long,fraud_label
GT001,12,Near Vadakkunnathan Temple,Round South,Thrissur,Thrissur,Kerala,680001,TS-6800-01-XX,84,VL2,10.5277,76.2145,False
GT002,3,Ayyanthole Road,Ayyanthole,Thrissur,Thrissur,Kerala,680003,FR-1111-11-ZZ,40,VL0,10.5161,76.2011,True
GT003,,,Olavakkode,Palakkad,Palakkad,Kerala,678002,XX-9999-99-99,22,VL0,10.7867,76.6548,False
GT004,7,Main Road,Round South,Thrissur,Thrissur,Kerala,680001,TS-6800-01-AB,45,VL1,10.5276,76.2144,False
GT005,9,Temple Street,Round South,Thrissur,Thrissur,Kerala,680001,TS-6800-01-XX,79,VL2,10.5275,76.2143,False
";

fn as_of() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .expect("valid instant")
}

fn corpora() -> Arc<ReferenceCorpora> {
    let mut corpora = ReferenceCorpora::default();
    corpora.load_grid(Cursor::new(GRID)).expect("grid loads");
    corpora.load_deliveries(Cursor::new(DELIVERIES)).expect("deliveries load");
    corpora.load_pings(Cursor::new(PINGS)).expect("pings load");
    corpora.load_landmarks(Cursor::new(LANDMARKS)).expect("landmarks load");
    corpora
        .load_postal_centroids(Cursor::new(POSTAL))
        .expect("postal centroids load");
    Arc::new(corpora)
}

fn engine() -> ScoringEngine {
    ScoringEngine::new(ScoringConfig::default(), corpora())
}

fn address(house: &str, street: &str, locality: &str, city: &str, postal: &str, cell: &str) -> Address {
    Address {
        house_number: house.to_string(),
        street: street.to_string(),
        locality: locality.to_string(),
        city: city.to_string(),
        district: city.to_string(),
        state: "Kerala".to_string(),
        postal_code: postal.to_string(),
        cell_id: cell.to_string(),
    }
}

#[test]
fn cell_missing_from_grid_scores_low() {
    let result = engine().score_at(
        &address("", "", "Olavakkode", "Palakkad", "678002", "XX-9999-99-99"),
        as_of(),
    );

    assert_eq!(result.score_of(SignalKind::Geo), 20.0);
    assert!(result.reason_codes.iter().any(|code| code == "digipin_not_in_grid"));
    assert!(result.vl <= ValidationLevel::Vl1);
    assert!((0.0..=100.0).contains(&result.acs));
}

#[test]
fn equal_primary_signals_agree_fully() {
    // below the corroboration threshold, so no bonus can mask residual spread
    let value = 52.176824280838964;
    let agreement = agreement_score(&[value; 5]);
    assert_eq!(agreement.std_dev, 0.0);
    assert_eq!(agreement.high_confidence, 0);
    assert_eq!(agreement.score, 100.0);

    let primaries: Vec<Evidence> = SignalKind::primary()
        .into_iter()
        .map(|kind| Evidence::from_reading(kind, SignalReading::new(value, Value::Null), 0.1))
        .collect();
    let subject = address("7", "Main Road", "Round South", "Thrissur", "680001", "TS-6800-01-XX");
    let reading = AgreementProvider.score(&SignalRequest {
        address: &subject,
        as_of: as_of(),
        earlier: &primaries,
    });

    assert_eq!(reading.score, 100.0);
    assert_eq!(reading.details["std_deviation"], 0.0);
    assert_eq!(reading.details["high_confidence_sources"], 0);
    assert_eq!(reading.details["average_score"], 52.18);
}

#[test]
fn burst_of_deliveries_is_penalised_as_fraud() {
    let result = engine().score_at(
        &address("3", "Ayyanthole Road", "Ayyanthole", "Thrissur", "680003", "FR-1111-11-ZZ"),
        as_of(),
    );

    let decay = result
        .evidence_for(SignalKind::TemporalDecay)
        .expect("decay evidence");
    assert_eq!(decay.details["decay_score"], 100.0);
    assert_eq!(decay.details["fraud_adjustment"], -40.0);
    assert_eq!(decay.details["total_deliveries"], 12);
    assert_eq!(decay.score, 60.0);
    assert!(decay.details["suspicious_patterns"]
        .as_array()
        .expect("pattern list")
        .iter()
        .any(|pattern| pattern == "suspicious_velocity_1d"));

    assert!(result.reason_codes.iter().any(|code| code == "suspicious_velocity_1d"));
    assert_eq!(result.advanced.fraud_risk.risk_level, RiskLevel::High);
    assert_eq!(result.advanced.escalation_path, EscalationPath::FraudQueue);
}

#[test]
fn optimizer_output_is_normalized_and_no_worse_than_defaults() {
    let records = load_ground_truth(Cursor::new(GROUND_TRUTH)).expect("ground truth loads");
    assert_eq!(records.len(), 5);

    let engine = engine();
    for strategy in [Strategy::Grid, Strategy::Constrained] {
        let optimizer = WeightOptimizer::new(&engine, &records, as_of(), OptimizerSettings::default());
        let outcome = optimizer.optimize(strategy);

        assert!((outcome.weights.sum() - 1.0).abs() <= WEIGHT_TOLERANCE, "{strategy}");
        assert!(outcome.loss <= outcome.baseline_loss, "{strategy}");
        assert_eq!(outcome.baseline_loss, optimizer.loss(&WeightVector::default().as_array()));
    }

    // the live engine is never recalibrated in place
    assert_eq!(engine.config().weights, WeightVector::default());
}

#[test]
fn evaluation_report_covers_every_section() {
    let records = load_ground_truth(Cursor::new(GROUND_TRUTH)).expect("ground truth loads");
    let engine = engine();
    let predictions = predict(&engine, &records, as_of());

    assert_eq!(predictions.len(), 5);
    // unknown cell and unknown postal code leave no predicted position
    assert_eq!(predictions[2].position, None);
    // cell not in grid falls back to the postal centroid
    assert!(predictions[3].position.is_some());
    assert!(predictions[1].fraud_predicted);

    let report = AccuracyEvaluator::new(records).comprehensive_report(&predictions);
    assert_eq!(report.total_ground_truth_samples, 5);
    assert!(report.acs_metrics.measured().is_some());
    let vl = report.vl_classification.measured().expect("vl report");
    assert_eq!(vl.n_samples, 5);
    let fraud = report.fraud_detection.measured().expect("fraud report");
    assert_eq!(fraud.confusion_matrix.tp, 1);
    assert!(fraud.roc_auc.is_some());
    assert_eq!(report.summary.targets_total, 4);
}

#[test]
fn corpora_load_from_a_data_directory() {
    let dir = std::env::temp_dir().join(format!("address-trust-corpora-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    for (file, contents) in [
        (GRID_FILE, GRID),
        (DELIVERY_FILE, DELIVERIES),
        (PING_FILE, PINGS),
        (LANDMARK_FILE, LANDMARKS),
    ] {
        std::fs::write(dir.join(file), contents).expect("write table");
    }

    let corpora = ReferenceCorpora::load_dir(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(corpora.has_grid());
    assert_eq!(corpora.deliveries_for("FR-1111-11-ZZ").len(), 12);
    assert_eq!(corpora.landmarks_for("TS-6800-01-XX").len(), 2);
    // postal table was never written
    assert!(corpora.postal_centroid("680001").is_none());
}
