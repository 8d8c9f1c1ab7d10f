use crate::evidence::SignalKind;
use crate::scoring::{ScoringConfig, ThresholdError, VlThresholds, WeightError, WeightVector};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub data: DataConfig,
    pub scoring: ScoringConfig,
    /// Whether the demonstration fixture table is consulted. Never true in
    /// production.
    pub fixture_overrides: bool,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let dir = PathBuf::from(env::var("APP_DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = parse_log_format(&env::var("APP_LOG_FORMAT").unwrap_or_default())?;

        let fixture_overrides = environment != AppEnvironment::Production
            && parse_flag("ACS_FIXTURE_OVERRIDES", &env::var("ACS_FIXTURE_OVERRIDES").unwrap_or_default())?;

        Ok(Self {
            environment,
            data: DataConfig { dir },
            scoring: load_scoring()?,
            fixture_overrides,
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
        })
    }
}

/// Location of the reference CSV tables.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub dir: PathBuf,
}

/// Shape of the lines written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human-readable events.
    #[default]
    Compact,
    /// One JSON object per event, for log shippers.
    Json,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

fn load_scoring() -> Result<ScoringConfig, ConfigError> {
    let mut weights = match env::var("ACS_WEIGHTS_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            let path = PathBuf::from(path.trim());
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::WeightsFile {
                path: path.clone(),
                source,
            })?;
            WeightVector::parse(&contents).map_err(|source| ConfigError::Weights { source })?
        }
        _ => WeightVector::default(),
    };

    let mut overrides = Vec::new();
    for kind in SignalKind::ordered() {
        let key = kind.env_key();
        if let Ok(raw) = env::var(key) {
            overrides.push((kind, parse_number(key, &raw)?));
        }
    }
    if !overrides.is_empty() {
        weights = weights
            .with_overrides(overrides)
            .map_err(|source| ConfigError::Weights { source })?;
    }

    let defaults = VlThresholds::default();
    let thresholds = VlThresholds::new(
        env_number("ACS_VL1_THRESHOLD", defaults.vl1())?,
        env_number("ACS_VL2_THRESHOLD", defaults.vl2())?,
        env_number("ACS_VL3_THRESHOLD", defaults.vl3())?,
    )
    .map_err(|source| ConfigError::Thresholds { source })?;

    let issuance_threshold = env_number("ACS_ISSUANCE_THRESHOLD", ScoringConfig::default().issuance_threshold)?;
    if !(0.0..=100.0).contains(&issuance_threshold) {
        return Err(ConfigError::InvalidNumber {
            key: "ACS_ISSUANCE_THRESHOLD".to_string(),
            value: issuance_threshold.to_string(),
        });
    }

    Ok(ScoringConfig {
        weights,
        thresholds,
        issuance_threshold,
    })
}

fn env_number(key: &str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_number(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_number(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

fn parse_log_format(raw: &str) -> Result<LogFormat, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "compact" | "text" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        _ => Err(ConfigError::InvalidLogFormat {
            value: raw.to_string(),
        }),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError::InvalidFlag {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { key: String, value: String },
    InvalidFlag { key: String, value: String },
    InvalidLogFormat { value: String },
    WeightsFile { path: PathBuf, source: std::io::Error },
    Weights { source: WeightError },
    Thresholds { source: ThresholdError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a finite number (got '{value}')")
            }
            ConfigError::InvalidFlag { key, value } => {
                write!(f, "{key} must be true or false (got '{value}')")
            }
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT must be compact or json (got '{value}')")
            }
            ConfigError::WeightsFile { path, .. } => {
                write!(f, "unable to read weights file {}", path.display())
            }
            ConfigError::Weights { source } => write!(f, "invalid weight configuration: {source}"),
            ConfigError::Thresholds { source } => write!(f, "invalid VL thresholds: {source}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidLogFormat { .. } => None,
            ConfigError::WeightsFile { source, .. } => Some(source),
            ConfigError::Weights { source } => Some(source),
            ConfigError::Thresholds { source } => Some(source),
        }
    }
}
