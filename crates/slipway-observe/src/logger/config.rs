use crate::logger::format::LoggerFormat;

/// Filter used when nothing else is configured.
pub const DEFAULT_DIRECTIVES: &str = "info,slipway.nat.iptables=warn";

/// Identifier journald entries are tagged with (`SYSLOG_IDENTIFIER`).
pub const DEFAULT_IDENTIFIER: &str = "slipwayd";

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives, e.g. `"info"` or `"info,slipway.nat=debug"`.
    pub directives: String,
    pub identifier: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || atty::is(atty::Stream::Stdout);
        Self {
            format: LoggerFormat::Text,
            directives: DEFAULT_DIRECTIVES.to_string(),
            identifier: DEFAULT_IDENTIFIER.to_string(),
            with_targets: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = directives.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Sets the filter from a bare level or a directive list.
    ///
    /// A bare level (`"debug"`) keeps the iptables override of [`DEFAULT_DIRECTIVES`];
    /// anything containing `=` or `,` replaces the whole filter.
    pub fn with_level(self, level: &str) -> Self {
        let level = level.trim();
        if level.contains(['=', ',']) {
            self.with_directives(level)
        } else {
            self.with_directives(format!("{level},slipway.nat.iptables=warn"))
        }
    }
}
