//! Offline calibration against a labeled ground-truth corpus: accuracy
//! reports for the live configuration and advisory weight optimization.

mod accuracy;
mod ground_truth;
mod optimizer;
pub mod stats;

pub use accuracy::{
    accuracy_grade, predict, AccuracyEvaluator, AccuracyReport, AcsReport, ClassMetrics,
    EvaluationError, FraudConfusion, FraudReport, PositionReport, PositionStats, Prediction,
    ReportSummary, Section, VlReport,
};
pub use ground_truth::{load_ground_truth, load_ground_truth_file, GroundTruthRecord};
pub use optimizer::{
    OptimizationOutcome, OptimizerSettings, Strategy, UnknownStrategy, WeightOptimizer,
};
