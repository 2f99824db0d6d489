//! Structured logging for the enrollment services.
//!
//! The configured level applies to the `urbanvote` crates; dependency
//! noise stays at `warn` unless `RUST_LOG` overrides the whole filter.

use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    BadDirective { directive: String, source: ParseError },
    AlreadyInitialized(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::BadDirective { directive, .. } => {
                write!(f, "unusable log directive '{directive}'")
            }
            TelemetryError::AlreadyInitialized(err) => {
                write!(f, "could not install log subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::BadDirective { source, .. } => Some(source),
            TelemetryError::AlreadyInitialized(err) => Some(&**err),
        }
    }
}

fn default_directive(level: &str) -> String {
    format!("warn,urbanvote={level},urbanvote_api={level}")
}

fn parse_filter(directive: String) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&directive).map_err(|source| TelemetryError::BadDirective {
        directive,
        source,
    })
}

fn log_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    parse_filter(default_directive(&config.log_level))
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(config)?)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_scopes_to_the_enrollment_crates() {
        let directive = default_directive("debug");
        assert_eq!(directive, "warn,urbanvote=debug,urbanvote_api=debug");
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn malformed_level_is_reported_with_the_directive() {
        let error =
            parse_filter(default_directive("no=such=level")).expect_err("directive cannot parse");
        assert!(matches!(error, TelemetryError::BadDirective { .. }));
        assert!(error.to_string().contains("no=such=level"));
    }
}
