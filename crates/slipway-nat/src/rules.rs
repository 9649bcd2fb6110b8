use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::NatError;

/// Executes one rule command against the `nat` table.
///
/// `args` never include the table selection; runners add it themselves.
#[async_trait]
pub trait RuleRunner: Send + Sync + 'static {
    async fn run(&self, args: &[String]) -> Result<(), NatError>;
}

/// Runs rules through the `iptables` binary.
#[derive(Debug, Clone)]
pub struct IptablesRunner {
    program: String,
}

impl Default for IptablesRunner {
    fn default() -> Self {
        Self {
            program: "iptables".to_string(),
        }
    }
}

impl IptablesRunner {
    /// Uses `program` instead of `iptables` found on `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl RuleRunner for IptablesRunner {
    async fn run(&self, args: &[String]) -> Result<(), NatError> {
        let command = format!("{} -t nat {}", self.program, args.join(" "));
        info!(target: "slipway.nat.iptables", %command, "rule");

        let output = Command::new(&self.program)
            .arg("-t")
            .arg("nat")
            .args(args)
            .output()
            .await
            .map_err(|e| NatError::RuleCommand {
                command: command.clone(),
                reason: format!("spawn: {e}"),
            })?;

        for stream in [&output.stdout, &output.stderr] {
            let text = String::from_utf8_lossy(stream);
            let text = text.trim();
            if !text.is_empty() {
                debug!(target: "slipway.nat.iptables", output = %text);
            }
        }

        if output.status.success() {
            return Ok(());
        }
        let reason = match output.status.code() {
            Some(code) => format!("exit code: {code}"),
            None => "terminated by signal".to_string(),
        };
        Err(NatError::RuleCommand { command, reason })
    }
}
