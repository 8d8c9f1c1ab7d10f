use super::ground_truth::GroundTruthRecord;
use super::stats::pearson;
use crate::domain::{round_to, ValidationLevel};
use crate::evidence::SignalKind;
use crate::scoring::{ScoringEngine, VlThresholds, WeightVector};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

const N: usize = SignalKind::COUNT;
const INITIAL_STEP: f64 = 0.05;
const MIN_STEP: f64 = 1e-3;
const MIN_IMPROVEMENT: f64 = 1e-9;
const BOUND_SLACK: f64 = 1e-12;
const PROJECTION_ROUNDS: usize = 100;

/// Hand-picked perturbations tried by the grid strategy. Each is applied on
/// top of the baseline and renormalized.
const GRID_ADJUSTMENTS: [&[(SignalKind, f64)]; 5] = [
    &[(SignalKind::Geo, 0.28), (SignalKind::Temporal, 0.13)],
    &[(SignalKind::Doc, 0.18), (SignalKind::Crowd, 0.05)],
    &[(SignalKind::GeoPrecision, 0.07), (SignalKind::Geo, 0.23)],
    &[
        (SignalKind::Geo, 0.22),
        (SignalKind::Temporal, 0.18),
        (SignalKind::Iot, 0.14),
        (SignalKind::Doc, 0.18),
        (SignalKind::Crowd, 0.10),
    ],
    &[
        (SignalKind::Geo, 0.30),
        (SignalKind::Doc, 0.20),
        (SignalKind::GeoPrecision, 0.08),
        (SignalKind::CrossCorpus, 0.07),
    ],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Grid,
    Constrained,
}

impl Strategy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Constrained => "constrained",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown optimization strategy '{0}' (expected grid or constrained)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "constrained" => Ok(Self::Constrained),
            _ => Err(UnknownStrategy(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    /// Ground-truth records re-scored per candidate, taken from the front.
    pub sample_size: usize,
    /// Sweep cap for the constrained strategy.
    pub max_iterations: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            sample_size: 50,
            max_iterations: 20,
            lower_bound: 0.01,
            upper_bound: 0.5,
        }
    }
}

/// Advisory result; it is never applied to a live engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    /// Strategy that actually ran (constrained falls back to grid).
    pub strategy: Strategy,
    pub weights: WeightVector,
    pub loss: f64,
    pub baseline_loss: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
    pub improved: bool,
}

#[derive(Debug, Clone)]
struct Sample {
    verified_acs: f64,
    verified_vl: ValidationLevel,
    scores: [f64; N],
}

/// Searches weight space for the vector minimising
/// `(1 - r) + mae / 100 + (1 - VL accuracy)` over a ground-truth sample.
/// Component scores do not depend on weights, so each record is scored once.
pub struct WeightOptimizer {
    baseline: WeightVector,
    thresholds: VlThresholds,
    samples: Vec<Sample>,
    settings: OptimizerSettings,
}

impl WeightOptimizer {
    pub fn new(
        engine: &ScoringEngine,
        records: &[GroundTruthRecord],
        as_of: NaiveDateTime,
        settings: OptimizerSettings,
    ) -> Self {
        let samples: Vec<Sample> = records
            .iter()
            .take(settings.sample_size)
            .map(|record| Sample {
                verified_acs: record.verified_acs,
                verified_vl: record.verified_vl,
                scores: engine.signal_scores_at(&record.address, as_of),
            })
            .collect();

        debug!(samples = samples.len(), "optimizer sample prepared");

        Self {
            baseline: engine.config().weights.clone(),
            thresholds: engine.config().thresholds,
            samples,
            settings,
        }
    }

    pub fn sample_len(&self) -> usize {
        self.samples.len()
    }

    pub fn baseline_loss(&self) -> f64 {
        self.loss(&self.baseline.as_array())
    }

    /// Loss of `weights` (in [`SignalKind::ordered`] order). With fewer than
    /// two samples correlation counts as 0 and MAE as 100.
    pub fn loss(&self, weights: &[f64; N]) -> f64 {
        if self.samples.is_empty() {
            return 3.0;
        }

        let mut truth = Vec::with_capacity(self.samples.len());
        let mut predicted = Vec::with_capacity(self.samples.len());
        let mut correct = 0usize;

        for sample in &self.samples {
            let weighted: f64 = sample.scores.iter().zip(weights).map(|(score, weight)| score * weight).sum();
            let acs = round_to(weighted, 2).clamp(0.0, 100.0);
            if self.thresholds.level_for(acs) == sample.verified_vl {
                correct += 1;
            }
            truth.push(sample.verified_acs);
            predicted.push(acs);
        }

        let (correlation, mae) = if self.samples.len() < 2 {
            (0.0, 100.0)
        } else {
            let total_error: f64 = truth.iter().zip(&predicted).map(|(t, p)| (t - p).abs()).sum();
            (pearson(&truth, &predicted).r, total_error / truth.len() as f64)
        };
        let vl_accuracy = correct as f64 / self.samples.len() as f64;

        (1.0 - correlation) + mae / 100.0 + (1.0 - vl_accuracy)
    }

    pub fn optimize(&self, strategy: Strategy) -> OptimizationOutcome {
        info!(
            strategy = strategy.label(),
            samples = self.samples.len(),
            "weight optimization started"
        );

        let outcome = match strategy {
            Strategy::Grid => self.grid_search(),
            Strategy::Constrained => self.constrained_search(),
        };

        info!(
            strategy = outcome.strategy.label(),
            baseline_loss = outcome.baseline_loss,
            loss = outcome.loss,
            converged = outcome.converged,
            "weight optimization finished"
        );
        outcome
    }

    fn grid_search(&self) -> OptimizationOutcome {
        let baseline_loss = self.baseline_loss();
        let mut best = self.baseline.clone();
        let mut best_loss = baseline_loss;
        let mut evaluations = 1;

        for (index, adjustment) in GRID_ADJUSTMENTS.iter().enumerate() {
            let candidate = match WeightVector::normalized(
                self.baseline.iter().chain(adjustment.iter().copied()),
            ) {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!(index, %err, "skipping grid candidate");
                    continue;
                }
            };

            let loss = self.loss(&candidate.as_array());
            evaluations += 1;
            debug!(index, loss, "grid candidate evaluated");

            if loss < best_loss {
                best_loss = loss;
                best = candidate;
            }
        }

        OptimizationOutcome {
            strategy: Strategy::Grid,
            improved: best_loss < baseline_loss,
            weights: best,
            loss: best_loss,
            baseline_loss,
            iterations: GRID_ADJUSTMENTS.len(),
            evaluations,
            converged: true,
        }
    }

    /// Pattern search inside `[lower, upper]` boxes on the unit simplex: mass
    /// moves between pairs of weights so the sum is preserved, and the step
    /// halves whenever a full sweep finds nothing better.
    fn constrained_search(&self) -> OptimizationOutcome {
        let OptimizerSettings {
            lower_bound: lower,
            upper_bound: upper,
            max_iterations,
            ..
        } = self.settings;

        let feasible = lower >= 0.0 && lower <= upper && N as f64 * lower <= 1.0 && N as f64 * upper >= 1.0;
        if !feasible {
            warn!(lower, upper, "weight bounds admit no normalized vector; falling back to grid search");
            return self.grid_search();
        }

        let baseline_loss = self.baseline_loss();
        let mut current = project(&self.baseline.as_array(), lower, upper);
        let mut current_loss = self.loss(&current);
        let mut evaluations = 2;
        let mut step = INITIAL_STEP;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < max_iterations {
            iterations += 1;
            let mut moved = false;

            for from in 0..N {
                for to in 0..N {
                    if from == to {
                        continue;
                    }

                    let mut candidate = current;
                    candidate[to] += step;
                    candidate[from] -= step;
                    if candidate[to] > upper + BOUND_SLACK || candidate[from] < lower - BOUND_SLACK {
                        continue;
                    }

                    let loss = self.loss(&candidate);
                    evaluations += 1;
                    if loss < current_loss - MIN_IMPROVEMENT {
                        current = candidate;
                        current_loss = loss;
                        moved = true;
                    }
                }
            }

            debug!(iterations, step, loss = current_loss, "constrained sweep finished");

            if !moved {
                step /= 2.0;
                if step < MIN_STEP {
                    converged = true;
                    break;
                }
            }
        }

        let accepted = converged && current_loss < baseline_loss;
        if !converged {
            warn!(iterations, "constrained search did not converge; keeping prior weights");
        }

        let weights = if accepted {
            WeightVector::normalized(SignalKind::ordered().into_iter().zip(current))
                .unwrap_or_else(|_| self.baseline.clone())
        } else {
            self.baseline.clone()
        };

        OptimizationOutcome {
            strategy: Strategy::Constrained,
            weights,
            loss: if accepted { current_loss } else { baseline_loss },
            baseline_loss,
            iterations,
            evaluations,
            converged,
            improved: accepted,
        }
    }
}

/// Euclidean projection onto `{w : sum(w) = 1, lower <= w_i <= upper}`,
/// found by bisecting the shift `tau` in `clamp(w_i - tau)`.
fn project(point: &[f64; N], lower: f64, upper: f64) -> [f64; N] {
    let total = |tau: f64| -> f64 { point.iter().map(|w| (w - tau).clamp(lower, upper)).sum() };

    let min = point.iter().copied().fold(f64::INFINITY, f64::min);
    let max = point.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut low = min - upper;
    let mut high = max - lower;

    for _ in 0..PROJECTION_ROUNDS {
        let mid = (low + high) / 2.0;
        if total(mid) > 1.0 {
            low = mid;
        } else {
            high = mid;
        }
    }

    let tau = (low + high) / 2.0;
    point.map(|w| (w - tau).clamp(lower, upper))
}
