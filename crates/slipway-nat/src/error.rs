use thiserror::Error;

#[derive(Debug, Error)]
pub enum NatError {
    /// A packet filter command could not be run or exited unsuccessfully.
    #[error("rule command `{command}` failed: {reason}")]
    RuleCommand { command: String, reason: String },

    #[error("original destination unavailable: {0}")]
    OriginalDestinationUnavailable(#[from] std::io::Error),

    #[error("unsupported: {0}")]
    Unsupported(String),
}
