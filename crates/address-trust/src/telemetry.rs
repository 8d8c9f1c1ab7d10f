use crate::config::{LogFormat, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    /// `APP_LOG_LEVEL` is not a valid filter directive.
    Filter { directive: String, source: ParseError },
    /// A global subscriber was already installed.
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { directive, .. } => {
                write!(f, "log filter '{directive}' is not a valid tracing directive")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "log subscriber could not be installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

/// `RUST_LOG` wins over the configured level so a single run can be traced
/// without touching `.env`.
fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::Filter {
        directive: config.log_level.clone(),
        source,
    })
}

/// Installs the global subscriber. Events go to stderr so JSON results and
/// reports on stdout stay machine-readable.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match config.format {
        LogFormat::Compact => builder.with_target(false).compact().try_init(),
        LogFormat::Json => builder.with_target(true).json().try_init(),
    }
    .map_err(TelemetryError::AlreadyInstalled)
}
