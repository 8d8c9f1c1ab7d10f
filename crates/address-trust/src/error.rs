use crate::calibration::EvaluationError;
use crate::config::ConfigError;
use crate::corpus::CorpusError;
use crate::scoring::WeightError;
use crate::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Corpus(CorpusError),
    Weights(WeightError),
    Evaluation(EvaluationError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Corpus(err) => write!(f, "reference data error: {}", err),
            AppError::Weights(err) => write!(f, "weight error: {}", err),
            AppError::Evaluation(err) => write!(f, "evaluation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Corpus(err) => Some(err),
            AppError::Weights(err) => Some(err),
            AppError::Evaluation(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CorpusError> for AppError {
    fn from(value: CorpusError) -> Self {
        Self::Corpus(value)
    }
}

impl From<WeightError> for AppError {
    fn from(value: WeightError) -> Self {
        Self::Weights(value)
    }
}

impl From<EvaluationError> for AppError {
    fn from(value: EvaluationError) -> Self {
        Self::Evaluation(value)
    }
}
