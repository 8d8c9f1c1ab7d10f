use address_trust::calibration::{AccuracyReport, OptimizationOutcome, Section};
use address_trust::evidence::SignalKind;
use address_trust::scoring::{Confirmation, WeightVector};
use address_trust::ScoreResult;
use std::fmt::Write;

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn section<T>(out: &mut String, title: &str, section: &Section<T>, body: impl FnOnce(&mut String, &T)) {
    let _ = writeln!(out, "\n{title}");
    match section {
        Section::Measured(report) => body(out, report),
        Section::Unavailable { error } => {
            let _ = writeln!(out, "  unavailable: {error}");
        }
    }
}

pub(crate) fn render_confirmation(before: &ScoreResult, after: &ScoreResult, confirmation: &Confirmation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Confirmation for {}", after.address.cell_id);
    let _ = writeln!(out, "  Confirmed: {}", yes_no(confirmation.confirmed));
    if let Some(level) = confirmation.mark_vl {
        let _ = writeln!(out, "  Assigned level: {level}");
    }
    if let Some(notes) = &confirmation.notes {
        let _ = writeln!(out, "  Notes: {notes}");
    }
    let _ = writeln!(out, "  ACS: {:.2} -> {:.2}", before.acs, after.acs);
    let _ = write!(out, "  VL: {} -> {}", before.vl, after.vl);
    out
}

pub(crate) fn render_accuracy_report(report: &AccuracyReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Accuracy evaluation");
    let _ = writeln!(out, "  Ground-truth samples: {}", report.total_ground_truth_samples);

    section(&mut out, "ACS prediction", &report.acs_metrics, |out, acs| {
        let _ = writeln!(
            out,
            "  Correlation: {:.4} (p={:.4}, target >= {:.2})",
            acs.correlation, acs.p_value, acs.target_correlation
        );
        let _ = writeln!(out, "  MAE: {:.2} (target <= {:.1})", acs.mae, acs.target_mae);
        let _ = writeln!(
            out,
            "  RMSE: {:.2}  median: {:.2}  p90: {:.2}  p95: {:.2}",
            acs.rmse, acs.median_error, acs.p90_error, acs.p95_error
        );
        let _ = writeln!(out, "  Meets target: {}", yes_no(acs.meets_target));
    });

    section(&mut out, "VL classification", &report.vl_classification, |out, vl| {
        let _ = writeln!(
            out,
            "  Accuracy: {:.2}% (target >= {:.0}%)",
            vl.overall_accuracy * 100.0,
            vl.target_accuracy * 100.0
        );
        let _ = writeln!(
            out,
            "  Macro precision/recall/F1: {:.3}/{:.3}/{:.3}",
            vl.macro_precision, vl.macro_recall, vl.macro_f1
        );
        for class in &vl.per_class {
            let _ = writeln!(
                out,
                "  {}: precision {:.3}, recall {:.3}, f1 {:.3}, support {}",
                class.level, class.precision, class.recall, class.f1, class.support
            );
        }
        let _ = writeln!(out, "  Meets target: {}", yes_no(vl.meets_target));
    });

    section(&mut out, "Position accuracy", &report.position_accuracy, |out, position| {
        for (level, stats) in &position.by_vl {
            let _ = writeln!(
                out,
                "  {level}: median {:.1} m, p90 {:.1} m, mean {:.1} m ({} samples)",
                stats.median_error_m, stats.p90_error_m, stats.mean_error_m, stats.n_samples
            );
        }
        let _ = writeln!(out, "  Meets target: {}", yes_no(position.meets_target));
    });

    section(&mut out, "Fraud detection", &report.fraud_detection, |out, fraud| {
        let _ = writeln!(
            out,
            "  TPR: {:.2}%  FPR: {:.2}%  precision: {:.2}%",
            fraud.true_positive_rate * 100.0,
            fraud.false_positive_rate * 100.0,
            fraud.precision * 100.0
        );
        match fraud.roc_auc {
            Some(auc) => {
                let _ = writeln!(out, "  ROC-AUC: {auc:.4}");
            }
            None => {
                let _ = writeln!(out, "  ROC-AUC: undefined");
            }
        }
        let matrix = fraud.confusion_matrix;
        let _ = writeln!(
            out,
            "  tp {}  fp {}  tn {}  fn {}",
            matrix.tp, matrix.fp, matrix.tn, matrix.false_negatives
        );
        let _ = writeln!(out, "  Meets target: {}", yes_no(fraud.meets_target));
    });

    let summary = &report.summary;
    let _ = writeln!(out, "\nSummary");
    let _ = writeln!(out, "  Targets met: {}/{}", summary.targets_count, summary.targets_total);
    if !summary.targets_met.is_empty() {
        let _ = writeln!(out, "  Passing: {}", summary.targets_met.join(", "));
    }
    let _ = write!(out, "  Grade: {}", summary.accuracy_grade);
    out
}

pub(crate) fn render_optimization(current: &WeightVector, outcome: &OptimizationOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Weight optimization ({})", outcome.strategy);
    let _ = writeln!(
        out,
        "  Loss: {:.4} -> {:.4} ({} evaluations, {} iterations, converged: {})",
        outcome.baseline_loss,
        outcome.loss,
        outcome.evaluations,
        outcome.iterations,
        yes_no(outcome.converged)
    );
    let _ = writeln!(out, "  {:<16} {:>8} {:>8}", "signal", "current", "proposed");
    for kind in SignalKind::ordered() {
        let _ = writeln!(
            out,
            "  {:<16} {:>8.4} {:>8.4}",
            kind.name(),
            current.weight(kind),
            outcome.weights.weight(kind)
        );
    }
    let verdict = if outcome.improved {
        "Proposed weights improve on the current configuration"
    } else {
        "Current weights are already the best found"
    };
    let _ = write!(out, "  {verdict}");
    out
}
