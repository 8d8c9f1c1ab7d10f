use address_trust::calibration::Strategy;
use address_trust::config::AppConfig;
use address_trust::corpus::{ReferenceCorpora, GROUND_TRUTH_FILE};
use address_trust::error::AppError;
use address_trust::scoring::DemoFixtures;
use address_trust::{telemetry, ScoringEngine, ValidationLevel};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Loaded configuration plus an engine over the configured data directory.
pub(crate) struct Runtime {
    pub(crate) config: AppConfig,
    pub(crate) engine: ScoringEngine,
}

impl Runtime {
    pub(crate) fn bootstrap() -> Result<Self, AppError> {
        let config = AppConfig::load()?;
        telemetry::init(&config.telemetry)?;

        let corpora = Arc::new(ReferenceCorpora::load_dir(&config.data.dir));
        let mut engine = ScoringEngine::new(config.scoring.clone(), corpora);
        if config.fixture_overrides {
            info!("demonstration fixtures enabled");
            engine = engine.with_fixture_overrides(Arc::new(DemoFixtures));
        }

        Ok(Self { config, engine })
    }

    pub(crate) fn ground_truth_path(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.data.dir.join(GROUND_TRUTH_FILE))
    }
}

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub(crate) fn parse_as_of(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
    {
        return Ok(parsed);
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS"))
}

pub(crate) fn parse_level(raw: &str) -> Result<ValidationLevel, String> {
    raw.parse::<ValidationLevel>().map_err(|err| err.to_string())
}

pub(crate) fn parse_strategy(raw: &str) -> Result<Strategy, String> {
    raw.parse::<Strategy>().map_err(|err| err.to_string())
}
