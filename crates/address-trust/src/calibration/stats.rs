//! Small self-contained statistics routines for calibration reports.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Pearson correlation with a two-sided p-value from a normal approximation
/// of the t statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub r: f64,
    pub p_value: f64,
}

impl Correlation {
    const UNDEFINED: Self = Self { r: 0.0, p_value: 1.0 };
}

/// Undefined inputs (fewer than two pairs, mismatched lengths, zero variance)
/// yield `r = 0, p = 1`.
pub fn pearson(x: &[f64], y: &[f64]) -> Correlation {
    let n = x.len();
    if n < 2 || n != y.len() {
        return Correlation::UNDEFINED;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Correlation::UNDEFINED;
    }

    let r = (covariance / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);
    let p_value = if r.abs() >= 1.0 {
        0.0
    } else {
        let t = r * ((n - 2) as f64).sqrt() / (1.0 - r * r).sqrt();
        2.0 * (1.0 - 0.5 * (1.0 + erf(t.abs() / std::f64::consts::SQRT_2)))
    };

    Correlation { r, p_value: p_value.clamp(0.0, 1.0) }
}

/// Abramowitz and Stegun 7.1.26; absolute error below 1.5e-7.
pub fn erf(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A: [f64; 5] = [
        0.254_829_592,
        -0.284_496_736,
        1.421_413_741,
        -1.453_152_027,
        1.061_405_429,
    ];

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = A.iter().rev().fold(0.0, |acc, coefficient| acc * t + coefficient) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Percentile with linear interpolation between closest ranks, `q` in
/// `[0, 100]`.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Area under the ROC curve as the Mann-Whitney probability that a random
/// positive outranks a random negative (ties count half). `None` unless both
/// classes are present.
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() {
        return None;
    }

    let positives: Vec<f64> = labels
        .iter()
        .zip(scores)
        .filter(|(label, _)| **label)
        .map(|(_, score)| *score)
        .collect();
    let negatives: Vec<f64> = labels
        .iter()
        .zip(scores)
        .filter(|(label, _)| !**label)
        .map(|(_, score)| *score)
        .collect();

    if positives.is_empty() || negatives.is_empty() {
        return None;
    }

    let wins: f64 = positives
        .iter()
        .flat_map(|positive| negatives.iter().map(move |negative| (positive, negative)))
        .map(|(positive, negative)| {
            if positive > negative {
                1.0
            } else if positive == negative {
                0.5
            } else {
                0.0
            }
        })
        .sum();

    Some(wins / (positives.len() * negatives.len()) as f64)
}
