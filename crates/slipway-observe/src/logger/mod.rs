mod config;
mod error;
mod format;
mod log;

pub use config::{DEFAULT_DIRECTIVES, DEFAULT_IDENTIFIER, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Installs the global `tracing` subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] on a second call.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::Logger::text(cfg)?,
        LoggerFormat::Json => log::Logger::json(cfg)?,
        LoggerFormat::Journald => log::Logger::journald(cfg)?,
    }
    tracing::debug!(format = %cfg.format, filter = %cfg.directives, "logger installed");
    Ok(())
}
