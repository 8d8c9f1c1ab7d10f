use super::ground_truth::GroundTruthRecord;
use super::stats::{mean, median, pearson, percentile, roc_auc};
use crate::domain::{round_to, Coordinate, ValidationLevel};
use crate::geo::haversine_m;
use crate::scoring::{RiskLevel, ScoringEngine};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const TARGET_CORRELATION: f64 = 0.95;
pub const TARGET_MAE: f64 = 5.0;
pub const TARGET_VL_ACCURACY: f64 = 0.95;
pub const TARGET_CLASS_PRECISION: f64 = 0.93;
pub const TARGET_VL3_MEDIAN_M: f64 = 100.0;
pub const TARGET_VL3_P90_M: f64 = 200.0;
pub const TARGET_TPR: f64 = 0.95;
pub const TARGET_FPR: f64 = 0.05;
pub const TARGET_FRAUD_PRECISION: f64 = 0.93;

const TARGETS_TOTAL: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("no ground truth or no predictions to evaluate")]
    NoData,
    #[error("only {matched} predictions matched ground truth; at least {required} required")]
    InsufficientMatches { matched: usize, required: usize },
}

/// Engine output for one ground-truth record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub test_id: String,
    pub acs: f64,
    pub vl: ValidationLevel,
    pub position: Option<Coordinate>,
    pub fraud_predicted: bool,
    /// Continuous fraud score in `[0, 1]`, when the predictor has one.
    pub fraud_score: Option<f64>,
}

/// Scores each record with `engine` as of `as_of`. The predicted position is
/// the grid-cell centroid, falling back to the postal-code centroid.
pub fn predict(engine: &ScoringEngine, records: &[GroundTruthRecord], as_of: NaiveDateTime) -> Vec<Prediction> {
    let corpora = engine.corpora();

    records
        .iter()
        .map(|record| {
            let result = engine.score_at(&record.address, as_of);
            let fraud = &result.advanced.fraud_risk;
            let position = corpora.cell_centroid(&record.address.cell_id).or_else(|| {
                corpora
                    .postal_centroid(&record.address.postal_code)
                    .map(|centroid| centroid.position)
            });

            Prediction {
                test_id: record.test_id.clone(),
                acs: result.acs,
                vl: result.vl,
                position,
                fraud_predicted: fraud.risk_level == RiskLevel::High,
                fraud_score: Some(fraud.risk_percentage / 100.0),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcsReport {
    pub correlation: f64,
    pub p_value: f64,
    pub mae: f64,
    pub rmse: f64,
    pub median_error: f64,
    pub p90_error: f64,
    pub p95_error: f64,
    pub n_samples: usize,
    pub target_correlation: f64,
    pub target_mae: f64,
    pub meets_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub level: ValidationLevel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlReport {
    pub overall_accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub per_class: Vec<ClassMetrics>,
    /// Rows are verified levels, columns predicted levels, both VL0..VL3.
    pub confusion_matrix: [[usize; 4]; 4],
    pub n_samples: usize,
    pub target_accuracy: f64,
    pub target_precision_per_class: f64,
    pub meets_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionStats {
    pub median_error_m: f64,
    pub mean_error_m: f64,
    pub p90_error_m: f64,
    pub p95_error_m: f64,
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    /// Keyed by the verified level; levels with no samples are omitted.
    pub by_vl: BTreeMap<ValidationLevel, PositionStats>,
    pub target_vl3_median: f64,
    pub target_vl3_p90: f64,
    pub meets_target: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FraudConfusion {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub false_negatives: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudReport {
    pub true_positive_rate: f64,
    pub false_positive_rate: f64,
    pub precision: f64,
    pub f1_score: f64,
    pub accuracy: f64,
    pub roc_auc: Option<f64>,
    pub confusion_matrix: FraudConfusion,
    pub n_samples: usize,
    pub n_fraud: usize,
    pub target_tpr: f64,
    pub target_fpr: f64,
    pub target_precision: f64,
    pub meets_target: bool,
}

/// A sub-report, or the reason it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Section<T> {
    Measured(T),
    Unavailable { error: String },
}

impl<T> Section<T> {
    fn from_result(result: Result<T, EvaluationError>) -> Self {
        match result {
            Ok(report) => Self::Measured(report),
            Err(err) => Self::Unavailable {
                error: err.to_string(),
            },
        }
    }

    pub fn measured(&self) -> Option<&T> {
        match self {
            Self::Measured(report) => Some(report),
            Self::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub targets_met: Vec<String>,
    pub targets_count: usize,
    pub targets_total: usize,
    pub overall_success: bool,
    pub accuracy_grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub total_ground_truth_samples: usize,
    pub acs_metrics: Section<AcsReport>,
    pub vl_classification: Section<VlReport>,
    pub position_accuracy: Section<PositionReport>,
    pub fraud_detection: Section<FraudReport>,
    pub summary: ReportSummary,
}

pub fn accuracy_grade(targets_met: usize) -> &'static str {
    match targets_met {
        4 => "A+",
        3 => "A",
        _ => "B+",
    }
}

/// Compares predictions against a labeled corpus. Predictions without a
/// matching `test_id` are ignored.
#[derive(Debug, Clone, Default)]
pub struct AccuracyEvaluator {
    records: Vec<GroundTruthRecord>,
    index: HashMap<String, usize>,
}

impl AccuracyEvaluator {
    pub fn new(records: Vec<GroundTruthRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.test_id.clone(), position))
            .collect();
        Self { records, index }
    }

    pub fn records(&self) -> &[GroundTruthRecord] {
        &self.records
    }

    fn matched<'a>(
        &'a self,
        predictions: &'a [Prediction],
    ) -> Result<Vec<(&'a GroundTruthRecord, &'a Prediction)>, EvaluationError> {
        if self.records.is_empty() || predictions.is_empty() {
            return Err(EvaluationError::NoData);
        }

        Ok(predictions
            .iter()
            .filter_map(|prediction| {
                self.index
                    .get(&prediction.test_id)
                    .map(|&position| (&self.records[position], prediction))
            })
            .collect())
    }

    pub fn acs_metrics(&self, predictions: &[Prediction]) -> Result<AcsReport, EvaluationError> {
        let pairs = self.matched(predictions)?;
        if pairs.len() < 2 {
            return Err(EvaluationError::InsufficientMatches {
                matched: pairs.len(),
                required: 2,
            });
        }

        let truth: Vec<f64> = pairs.iter().map(|(record, _)| record.verified_acs).collect();
        let predicted: Vec<f64> = pairs.iter().map(|(_, prediction)| prediction.acs).collect();
        let errors: Vec<f64> = truth
            .iter()
            .zip(&predicted)
            .map(|(t, p)| (t - p).abs())
            .collect();
        let squared: Vec<f64> = errors.iter().map(|error| error * error).collect();

        let correlation = pearson(&truth, &predicted);
        let mae = mean(&errors).unwrap_or_default();
        let rmse = mean(&squared).unwrap_or_default().sqrt();

        Ok(AcsReport {
            correlation: round_to(correlation.r, 4),
            p_value: round_to(correlation.p_value, 6),
            mae: round_to(mae, 2),
            rmse: round_to(rmse, 2),
            median_error: round_to(median(&errors).unwrap_or_default(), 2),
            p90_error: round_to(percentile(&errors, 90.0).unwrap_or_default(), 2),
            p95_error: round_to(percentile(&errors, 95.0).unwrap_or_default(), 2),
            n_samples: pairs.len(),
            target_correlation: TARGET_CORRELATION,
            target_mae: TARGET_MAE,
            meets_target: correlation.r >= TARGET_CORRELATION && mae <= TARGET_MAE,
        })
    }

    pub fn vl_classification(&self, predictions: &[Prediction]) -> Result<VlReport, EvaluationError> {
        let pairs = self.matched(predictions)?;
        if pairs.is_empty() {
            return Err(EvaluationError::InsufficientMatches {
                matched: 0,
                required: 1,
            });
        }

        let mut confusion = [[0usize; 4]; 4];
        for (record, prediction) in &pairs {
            confusion[record.verified_vl.index()][prediction.vl.index()] += 1;
        }

        let per_class: Vec<ClassMetrics> = ValidationLevel::ordered()
            .into_iter()
            .map(|level| {
                let i = level.index();
                let tp = confusion[i][i];
                let predicted: usize = (0..4).map(|row| confusion[row][i]).sum();
                let support: usize = confusion[i].iter().sum();

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                ClassMetrics {
                    level,
                    precision: round_to(precision, 4),
                    recall: round_to(recall, 4),
                    f1: round_to(harmonic_mean(precision, recall), 4),
                    support,
                }
            })
            .collect();

        let correct: usize = (0..4).map(|i| confusion[i][i]).sum();
        let accuracy = ratio(correct, pairs.len());
        let macro_of = |metric: fn(&ClassMetrics) -> f64| {
            per_class.iter().map(metric).sum::<f64>() / per_class.len() as f64
        };
        let macro_precision = macro_of(|class| class.precision);

        Ok(VlReport {
            overall_accuracy: round_to(accuracy, 4),
            macro_precision: round_to(macro_precision, 4),
            macro_recall: round_to(macro_of(|class| class.recall), 4),
            macro_f1: round_to(macro_of(|class| class.f1), 4),
            confusion_matrix: confusion,
            n_samples: pairs.len(),
            target_accuracy: TARGET_VL_ACCURACY,
            target_precision_per_class: TARGET_CLASS_PRECISION,
            meets_target: accuracy >= TARGET_VL_ACCURACY && macro_precision >= TARGET_CLASS_PRECISION,
            per_class,
        })
    }

    /// Haversine error between predicted and verified positions, grouped by
    /// verified level. Predictions without a position are excluded.
    pub fn position_accuracy(&self, predictions: &[Prediction]) -> Result<PositionReport, EvaluationError> {
        let pairs = self.matched(predictions)?;

        let mut errors: BTreeMap<ValidationLevel, Vec<f64>> = BTreeMap::new();
        for (record, prediction) in &pairs {
            if let Some(position) = prediction.position {
                errors
                    .entry(record.verified_vl)
                    .or_default()
                    .push(haversine_m(record.verified_position, position));
            }
        }

        let by_vl: BTreeMap<ValidationLevel, PositionStats> = errors
            .into_iter()
            .map(|(level, distances)| {
                let stats = PositionStats {
                    median_error_m: round_to(median(&distances).unwrap_or_default(), 1),
                    mean_error_m: round_to(mean(&distances).unwrap_or_default(), 1),
                    p90_error_m: round_to(percentile(&distances, 90.0).unwrap_or_default(), 1),
                    p95_error_m: round_to(percentile(&distances, 95.0).unwrap_or_default(), 1),
                    n_samples: distances.len(),
                };
                (level, stats)
            })
            .collect();

        let meets_target = by_vl.get(&ValidationLevel::Vl3).is_some_and(|stats| {
            stats.median_error_m <= TARGET_VL3_MEDIAN_M && stats.p90_error_m <= TARGET_VL3_P90_M
        });

        Ok(PositionReport {
            by_vl,
            target_vl3_median: TARGET_VL3_MEDIAN_M,
            target_vl3_p90: TARGET_VL3_P90_M,
            meets_target,
        })
    }

    pub fn fraud_detection(&self, predictions: &[Prediction]) -> Result<FraudReport, EvaluationError> {
        let pairs = self.matched(predictions)?;
        if pairs.is_empty() {
            return Err(EvaluationError::InsufficientMatches {
                matched: 0,
                required: 1,
            });
        }

        let mut counts = FraudConfusion::default();
        for (record, prediction) in &pairs {
            match (record.fraud, prediction.fraud_predicted) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.false_negatives += 1,
            }
        }

        let tpr = ratio(counts.tp, counts.tp + counts.false_negatives);
        let fpr = ratio(counts.fp, counts.fp + counts.tn);
        let precision = ratio(counts.tp, counts.tp + counts.fp);
        let accuracy = ratio(counts.tp + counts.tn, pairs.len());

        let scores: Option<Vec<f64>> = pairs.iter().map(|(_, prediction)| prediction.fraud_score).collect();
        let labels: Vec<bool> = pairs.iter().map(|(record, _)| record.fraud).collect();
        let auc = scores.and_then(|scores| roc_auc(&labels, &scores));

        Ok(FraudReport {
            true_positive_rate: round_to(tpr, 4),
            false_positive_rate: round_to(fpr, 4),
            precision: round_to(precision, 4),
            f1_score: round_to(harmonic_mean(precision, tpr), 4),
            accuracy: round_to(accuracy, 4),
            roc_auc: auc.map(|value| round_to(value, 4)),
            confusion_matrix: counts,
            n_samples: pairs.len(),
            n_fraud: labels.iter().filter(|label| **label).count(),
            target_tpr: TARGET_TPR,
            target_fpr: TARGET_FPR,
            target_precision: TARGET_FRAUD_PRECISION,
            meets_target: tpr >= TARGET_TPR && fpr <= TARGET_FPR && precision >= TARGET_FRAUD_PRECISION,
        })
    }

    pub fn comprehensive_report(&self, predictions: &[Prediction]) -> AccuracyReport {
        let acs_metrics = Section::from_result(self.acs_metrics(predictions));
        let vl_classification = Section::from_result(self.vl_classification(predictions));
        let position_accuracy = Section::from_result(self.position_accuracy(predictions));
        let fraud_detection = Section::from_result(self.fraud_detection(predictions));

        let targets_met: Vec<String> = [
            ("ACS Correlation", acs_metrics.measured().is_some_and(|r| r.meets_target)),
            ("VL Classification", vl_classification.measured().is_some_and(|r| r.meets_target)),
            ("Position Accuracy", position_accuracy.measured().is_some_and(|r| r.meets_target)),
            ("Fraud Detection", fraud_detection.measured().is_some_and(|r| r.meets_target)),
        ]
        .into_iter()
        .filter(|(_, met)| *met)
        .map(|(name, _)| name.to_string())
        .collect();

        let targets_count = targets_met.len();
        debug!(targets_count, predictions = predictions.len(), "accuracy report computed");

        AccuracyReport {
            total_ground_truth_samples: self.records.len(),
            acs_metrics,
            vl_classification,
            position_accuracy,
            fraud_detection,
            summary: ReportSummary {
                targets_met,
                targets_count,
                targets_total: TARGETS_TOTAL,
                overall_success: targets_count >= TARGETS_TOTAL,
                accuracy_grade: accuracy_grade(targets_count).to_string(),
            },
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic_mean(a: f64, b: f64) -> f64 {
    if a + b > 0.0 {
        2.0 * a * b / (a + b)
    } else {
        0.0
    }
}
