use std::{net::SocketAddr, str::FromStr};

use slipway_observe::{DEFAULT_JOURNAL_QUEUE, LoggerConfig, LoggerError, LoggerFormat};
use thiserror::Error;

pub const ENV_CHAIN: &str = "SLIPWAY_CHAIN";
pub const ENV_API_ADDR: &str = "SLIPWAY_API_ADDR";
pub const ENV_PROXY_PORT: &str = "SLIPWAY_PROXY_PORT";
pub const ENV_LOG_LEVEL: &str = "SLIPWAY_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "SLIPWAY_LOG_FORMAT";
pub const ENV_NOFILE: &str = "SLIPWAY_NOFILE";
pub const ENV_EVENT_QUEUE: &str = "SLIPWAY_EVENT_QUEUE";
/// Set by systemd when stdout is connected to the journal.
pub const ENV_JOURNAL_STREAM: &str = "JOURNAL_STREAM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Logger(#[from] LoggerError),
}

/// Daemon settings, read from `SLIPWAY_*` environment variables.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Name of the `nat` chain owned by the daemon.
    pub chain: String,
    /// Control API listen address; port 0 picks a free port.
    pub api_addr: SocketAddr,
    /// Local port redirected connections are sent to.
    pub proxy_port: u16,
    /// Soft and hard `RLIMIT_NOFILE` to request at start.
    pub nofile: u64,
    /// Capacity of the journal subscriber's event queue.
    pub event_queue: usize,
    pub logger: LoggerConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            chain: "SLIPWAY".to_string(),
            api_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            proxy_port: 1234,
            nofile: 999_999,
            event_queue: DEFAULT_JOURNAL_QUEUE,
            logger: LoggerConfig::default(),
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from an arbitrary variable source; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(chain) = lookup(ENV_CHAIN) {
            if chain.is_empty() || chain.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid {
                    var: ENV_CHAIN,
                    value: chain,
                    reason: "chain name must be a single non-empty word".into(),
                });
            }
            cfg.chain = chain;
        }
        if let Some(addr) = parsed(&lookup, ENV_API_ADDR)? {
            cfg.api_addr = addr;
        }
        if let Some(port) = parsed(&lookup, ENV_PROXY_PORT)? {
            cfg.proxy_port = port;
        }
        if let Some(nofile) = parsed(&lookup, ENV_NOFILE)? {
            cfg.nofile = nofile;
        }
        if let Some(queue) = parsed(&lookup, ENV_EVENT_QUEUE)? {
            cfg.event_queue = queue;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            cfg.logger = cfg.logger.with_level(&level);
        }
        cfg.logger.format = match lookup(ENV_LOG_FORMAT) {
            Some(format) => format.parse::<LoggerFormat>()?,
            None => LoggerFormat::preferred(lookup(ENV_JOURNAL_STREAM).is_some()),
        };

        Ok(cfg)
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.trim().parse::<T>() {
        Ok(v) => Ok(Some(v)),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}
