use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format: {0} (expected: text|json|journald)")]
    InvalidFormat(String),

    #[error("journald output needs Linux and the `journald` feature")]
    JournaldNotSupported,

    /// A global subscriber (or `log` logger) is already installed.
    #[error("logger already initialized")]
    AlreadyInitialized,

    #[error("logger initialization failed: {0}")]
    InitializationFailed(String),

    #[error("invalid log filter `{directives}`: {reason}")]
    InvalidLogLevel { directives: String, reason: String },
}

impl From<tracing_subscriber::util::TryInitError> for LoggerError {
    fn from(_: tracing_subscriber::util::TryInitError) -> Self {
        LoggerError::AlreadyInitialized
    }
}
