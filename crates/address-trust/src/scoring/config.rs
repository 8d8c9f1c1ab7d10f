use crate::domain::ValidationLevel;
use crate::evidence::SignalKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Allowed deviation of a weight vector's sum from 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

const DEFAULT_WEIGHTS: [(SignalKind, f64); SignalKind::COUNT] = [
    (SignalKind::Geo, 0.206),
    (SignalKind::GeoPrecision, 0.047),
    (SignalKind::Temporal, 0.168),
    (SignalKind::TemporalDecay, 0.047),
    (SignalKind::Iot, 0.131),
    (SignalKind::Doc, 0.168),
    (SignalKind::Crowd, 0.093),
    (SignalKind::Linguistic, 0.047),
    (SignalKind::CrossCorpus, 0.047),
    (SignalKind::History, 0.047),
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),
    #[error("no weight given for signal '{0}'")]
    MissingSignal(SignalKind),
    #[error("weight for '{kind}' is {value}, outside [{min}, {max}]")]
    OutOfBounds {
        kind: SignalKind,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("weights sum to {sum:.6}, expected 1.0")]
    NotNormalized { sum: f64 },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Non-negative per-signal weights summing to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightVector {
    weights: BTreeMap<SignalKind, f64>,
}

impl WeightVector {
    /// Strict constructor: every signal present, each weight in `[0, 1]`,
    /// sum within [`WEIGHT_TOLERANCE`] of 1.
    pub fn new(weights: BTreeMap<SignalKind, f64>) -> Result<Self, WeightError> {
        let vector = Self::complete(weights)?;
        vector.check_bounds(0.0, 1.0)?;

        let sum = vector.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(WeightError::NotNormalized { sum });
        }

        Ok(vector)
    }

    /// Scales non-negative raw weights so they sum to 1. Signals not listed
    /// get zero weight.
    pub fn normalized<I>(raw: I) -> Result<Self, WeightError>
    where
        I: IntoIterator<Item = (SignalKind, f64)>,
    {
        let mut weights: BTreeMap<SignalKind, f64> =
            SignalKind::ordered().into_iter().map(|kind| (kind, 0.0)).collect();
        for (kind, value) in raw {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightError::OutOfBounds {
                    kind,
                    value,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
            weights.insert(kind, value);
        }

        let sum: f64 = weights.values().sum();
        if sum <= 0.0 {
            return Err(WeightError::NotNormalized { sum });
        }

        weights.values_mut().for_each(|weight| *weight /= sum);
        Ok(Self { weights })
    }

    pub fn from_array(values: [f64; SignalKind::COUNT]) -> Result<Self, WeightError> {
        Self::new(SignalKind::ordered().into_iter().zip(values).collect())
    }

    /// Weights in [`SignalKind::ordered`] order.
    pub fn as_array(&self) -> [f64; SignalKind::COUNT] {
        SignalKind::ordered().map(|kind| self.weight(kind))
    }

    pub fn weight(&self, kind: SignalKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalKind, f64)> + '_ {
        self.weights.iter().map(|(kind, weight)| (*kind, *weight))
    }

    pub fn check_bounds(&self, min: f64, max: f64) -> Result<(), WeightError> {
        for (kind, value) in self.iter() {
            if !value.is_finite() || value < min - WEIGHT_TOLERANCE || value > max + WEIGHT_TOLERANCE {
                return Err(WeightError::OutOfBounds {
                    kind,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Copy with some weights replaced, validated strictly.
    pub fn with_overrides<I>(&self, overrides: I) -> Result<Self, WeightError>
    where
        I: IntoIterator<Item = (SignalKind, f64)>,
    {
        let mut weights = self.weights.clone();
        weights.extend(overrides);
        Self::new(weights)
    }

    /// Parses `name = value` lines; blank lines and `#` comments are ignored.
    pub fn parse(contents: &str) -> Result<Self, WeightError> {
        let mut weights = BTreeMap::new();

        for (index, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (name, value) = line.split_once('=').ok_or_else(|| WeightError::Parse {
                line: index + 1,
                message: format!("expected `name = value`, found '{line}'"),
            })?;
            let kind = SignalKind::from_name(name)
                .ok_or_else(|| WeightError::UnknownSignal(name.trim().to_string()))?;
            let value = value.trim().parse::<f64>().map_err(|err| WeightError::Parse {
                line: index + 1,
                message: format!("invalid weight '{}': {err}", value.trim()),
            })?;

            weights.insert(kind, value);
        }

        Self::new(weights)
    }

    pub fn to_file_contents(&self, header: &str) -> String {
        let mut contents = String::new();
        for line in header.lines() {
            contents.push_str("# ");
            contents.push_str(line);
            contents.push('\n');
        }
        for (kind, weight) in self.iter() {
            contents.push_str(&format!("{} = {weight:.10}\n", kind.name()));
        }
        contents
    }

    fn complete(weights: BTreeMap<SignalKind, f64>) -> Result<Self, WeightError> {
        if let Some(missing) = SignalKind::ordered()
            .into_iter()
            .find(|kind| !weights.contains_key(kind))
        {
            return Err(WeightError::MissingSignal(missing));
        }
        Ok(Self { weights })
    }
}

impl Default for WeightVector {
    /// The calibrated weights, rescaled so they sum to exactly 1.
    fn default() -> Self {
        let sum: f64 = DEFAULT_WEIGHTS.iter().map(|(_, weight)| weight).sum();
        Self {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(kind, weight)| (*kind, weight / sum))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("validation thresholds must satisfy 0 < VL1 < VL2 < VL3 <= 100 (got {vl1}, {vl2}, {vl3})")]
pub struct ThresholdError {
    pub vl1: f64,
    pub vl2: f64,
    pub vl3: f64,
}

/// Minimum ACS for VL1, VL2 and VL3.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VlThresholds {
    vl1: f64,
    vl2: f64,
    vl3: f64,
}

impl VlThresholds {
    pub fn new(vl1: f64, vl2: f64, vl3: f64) -> Result<Self, ThresholdError> {
        let increasing = 0.0 < vl1 && vl1 < vl2 && vl2 < vl3 && vl3 <= 100.0;
        if !increasing {
            return Err(ThresholdError { vl1, vl2, vl3 });
        }
        Ok(Self { vl1, vl2, vl3 })
    }

    pub fn vl1(&self) -> f64 {
        self.vl1
    }

    pub fn vl2(&self) -> f64 {
        self.vl2
    }

    pub fn vl3(&self) -> f64 {
        self.vl3
    }

    pub fn level_for(&self, acs: f64) -> ValidationLevel {
        if acs >= self.vl3 {
            ValidationLevel::Vl3
        } else if acs >= self.vl2 {
            ValidationLevel::Vl2
        } else if acs >= self.vl1 {
            ValidationLevel::Vl1
        } else {
            ValidationLevel::Vl0
        }
    }
}

impl Default for VlThresholds {
    fn default() -> Self {
        Self {
            vl1: 42.0,
            vl2: 68.0,
            vl3: 87.0,
        }
    }
}

/// Immutable scoring parameters handed to [`super::ScoringEngine::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringConfig {
    pub weights: WeightVector,
    pub thresholds: VlThresholds,
    /// Minimum ACS at which credential issuance is warranted.
    pub issuance_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: WeightVector::default(),
            thresholds: VlThresholds::default(),
            issuance_threshold: 65.0,
        }
    }
}
