use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError};

pub struct Logger;

impl Logger {
    pub fn text(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let layer = fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer());

        tracing_subscriber::registry()
            .with(mk_filter(&cfg.directives)?)
            .with(layer)
            .try_init()?;
        Ok(())
    }

    pub fn json(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        let layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer());

        tracing_subscriber::registry()
            .with(mk_filter(&cfg.directives)?)
            .with(layer)
            .try_init()?;
        Ok(())
    }

    pub fn journald(cfg: &LoggerConfig) -> Result<(), LoggerError> {
        mk_journald(mk_filter(&cfg.directives)?, &cfg.identifier)
    }
}

pub(crate) fn mk_filter(directives: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directives).map_err(|e| LoggerError::InvalidLogLevel {
        directives: directives.to_string(),
        reason: e.to_string(),
    })
}

/// Local time when the offset can be determined, UTC otherwise.
fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn mk_journald(filter: EnvFilter, identifier: &str) -> Result<(), LoggerError> {
    let journald = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier(identifier.to_string());
    tracing_subscriber::registry()
        .with(filter)
        .with(journald)
        .try_init()?;
    Ok(())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn mk_journald(_filter: EnvFilter, _identifier: &str) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_per_target_directives() {
        assert!(mk_filter("info,slipway.nat.iptables=debug").is_ok());
    }

    #[test]
    fn rejects_garbage_level() {
        match mk_filter("info,slipway=loud") {
            Err(LoggerError::InvalidLogLevel { directives, .. }) => {
                assert_eq!(directives, "info,slipway=loud");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn second_init_is_rejected() {
        let cfg = LoggerConfig::default().with_level("warn");
        // Another test binary may have installed a subscriber first; either way the
        // second call must fail.
        let _ = Logger::text(&cfg);
        assert!(matches!(
            Logger::json(&cfg),
            Err(LoggerError::AlreadyInitialized)
        ));
    }
}
