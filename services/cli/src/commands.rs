use crate::cli::{ConfirmArgs, EvaluateArgs, OptimizeArgs, ScoreArgs};
use crate::infra::{now, Runtime};
use crate::render::{render_accuracy_report, render_confirmation, render_optimization};
use address_trust::calibration::{
    load_ground_truth_file, predict, AccuracyEvaluator, OptimizerSettings, WeightOptimizer,
};
use address_trust::error::AppError;
use address_trust::scoring::Confirmation;
use address_trust::{Address, ScoreResult};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct ScoreOutput<'a> {
    #[serde(flatten)]
    result: &'a ScoreResult,
    issuance_warranted: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let runtime = Runtime::bootstrap()?;
    let address = Address::from(args.address);
    let result = runtime
        .engine
        .score_at(&address, args.as_of.unwrap_or_else(now));

    print_json(&ScoreOutput {
        issuance_warranted: runtime.engine.issuance_warranted(&result),
        result: &result,
    })
}

pub(crate) fn run_confirm(args: ConfirmArgs) -> Result<(), AppError> {
    let runtime = Runtime::bootstrap()?;
    let address = Address::from(args.address);
    let before = runtime
        .engine
        .score_at(&address, args.as_of.unwrap_or_else(now));

    let confirmation = Confirmation {
        confirmed: !args.unconfirmed,
        mark_vl: args.mark_vl,
        notes: args.notes,
    };
    let after = runtime.engine.confirm(&before, &confirmation);

    println!("{}", render_confirmation(&before, &after, &confirmation));
    Ok(())
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let runtime = Runtime::bootstrap()?;
    let mut records = load_ground_truth_file(runtime.ground_truth_path(args.ground_truth.as_deref()))?;
    if let Some(sample) = args.sample {
        records.truncate(sample);
    }

    let as_of = args.as_of.unwrap_or_else(now);
    let predictions = predict(&runtime.engine, &records, as_of);
    let report = AccuracyEvaluator::new(records).comprehensive_report(&predictions);
    info!(
        samples = report.total_ground_truth_samples,
        targets_met = report.summary.targets_count,
        grade = %report.summary.accuracy_grade,
        "evaluation finished"
    );

    if args.json {
        print_json(&report)
    } else {
        println!("{}", render_accuracy_report(&report));
        Ok(())
    }
}

pub(crate) fn run_optimize(args: OptimizeArgs) -> Result<(), AppError> {
    let runtime = Runtime::bootstrap()?;
    let records = load_ground_truth_file(runtime.ground_truth_path(args.ground_truth.as_deref()))?;

    let settings = OptimizerSettings {
        sample_size: args.sample,
        max_iterations: args.max_iterations,
        ..OptimizerSettings::default()
    };
    let optimizer = WeightOptimizer::new(
        &runtime.engine,
        &records,
        args.as_of.unwrap_or_else(now),
        settings,
    );
    let outcome = optimizer.optimize(args.strategy);

    println!(
        "{}",
        render_optimization(&runtime.engine.config().weights, &outcome)
    );

    if let Some(path) = args.output {
        let header = format!(
            "optimized with {} strategy over {} samples\nloss {:.4} (baseline {:.4})",
            outcome.strategy,
            optimizer.sample_len(),
            outcome.loss,
            outcome.baseline_loss
        );
        std::fs::write(&path, outcome.weights.to_file_contents(&header))?;
        info!(path = %path.display(), "optimized weights written");
        println!("Weights written to {}", path.display());
    }

    Ok(())
}
