use std::{collections::BTreeMap, fmt, net::Ipv4Addr, sync::Arc};

use slipway_model::Protocol;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::{IptablesRunner, RuleRunner};

/// Packets carrying this TTL are never redirected, which lets the proxy reach the
/// real endpoints behind a virtual address.
const BYPASS_TTL: u8 = 42;

/// Key of a redirect mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub proto: Protocol,
    pub ip: Ipv4Addr,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.proto, self.ip)
    }
}

/// Redirects traffic for virtual addresses to local ports through a dedicated chain.
///
/// All rule mutations are serialized. Rule command failures are logged and otherwise
/// ignored: the mapping table always reflects what was requested.
pub struct Translator {
    chain: String,
    runner: Arc<dyn RuleRunner>,
    mappings: Mutex<BTreeMap<Address, u16>>,
}

impl Translator {
    /// Translator driving the system `iptables`.
    pub fn new(chain: impl Into<String>) -> Self {
        Self::with_runner(chain, Arc::new(IptablesRunner::default()))
    }

    pub fn with_runner(chain: impl Into<String>, runner: Arc<dyn RuleRunner>) -> Self {
        Self {
            chain: chain.into(),
            runner,
            mappings: Mutex::new(BTreeMap::new()),
        }
    }

    #[inline]
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Creates the chain and hooks it into `OUTPUT` and `PREROUTING`.
    ///
    /// Stale jump rules from a previous run are removed first, so enabling twice leaves
    /// exactly one jump per hook. Loopback TCP is exempt from redirection.
    #[instrument(level = "debug", skip(self), fields(chain = %self.chain))]
    pub async fn enable(&self) {
        let _guard = self.mappings.lock().await;
        let chain = &self.chain;

        self.ipt(&format!("-D OUTPUT -j {chain}")).await;
        // PREROUTING catches traffic from local containers.
        self.ipt(&format!("-D PREROUTING -j {chain}")).await;
        self.ipt(&format!("-N {chain}")).await;
        self.ipt(&format!("-F {chain}")).await;
        self.ipt(&format!("-I OUTPUT 1 -j {chain}")).await;
        self.ipt(&format!("-I PREROUTING 1 -j {chain}")).await;
        self.ipt(&format!("-A {chain} -j RETURN --dest 127.0.0.1/32 -p tcp")).await;
    }

    /// Unhooks, flushes and deletes the chain. Best effort.
    #[instrument(level = "debug", skip(self), fields(chain = %self.chain))]
    pub async fn disable(&self) {
        let mut mappings = self.mappings.lock().await;
        let chain = &self.chain;

        self.ipt(&format!("-D OUTPUT -j {chain}")).await;
        self.ipt(&format!("-D PREROUTING -j {chain}")).await;
        self.ipt(&format!("-F {chain}")).await;
        self.ipt(&format!("-X {chain}")).await;

        // The flush dropped every redirect rule.
        mappings.clear();
    }

    pub async fn forward_tcp(&self, ip: Ipv4Addr, port: u16) {
        self.forward(Protocol::Tcp, ip, port).await
    }

    pub async fn forward_udp(&self, ip: Ipv4Addr, port: u16) {
        self.forward(Protocol::Udp, ip, port).await
    }

    /// Installs `(proto, ip) → port`, replacing any previous rule for the same key.
    #[instrument(level = "debug", skip(self), fields(chain = %self.chain))]
    pub async fn forward(&self, proto: Protocol, ip: Ipv4Addr, port: u16) {
        let mut mappings = self.mappings.lock().await;
        let addr = Address { proto, ip };

        self.clear_locked(&mut mappings, addr).await;
        self.ipt(&self.redirect_rule('A', addr, port)).await;
        mappings.insert(addr, port);
    }

    pub async fn clear_tcp(&self, ip: Ipv4Addr) {
        self.clear(Protocol::Tcp, ip).await
    }

    /// Removes the mapping for `(proto, ip)` and its rule. No-op if there is none.
    pub async fn clear(&self, proto: Protocol, ip: Ipv4Addr) {
        let mut mappings = self.mappings.lock().await;
        self.clear_locked(&mut mappings, Address { proto, ip }).await;
    }

    /// Snapshot of the active mappings.
    pub async fn mappings(&self) -> BTreeMap<Address, u16> {
        self.mappings.lock().await.clone()
    }

    async fn clear_locked(&self, mappings: &mut BTreeMap<Address, u16>, addr: Address) {
        if let Some(previous) = mappings.remove(&addr) {
            debug!(%addr, port = previous, "removing redirect");
            self.ipt(&self.redirect_rule('D', addr, previous)).await;
        }
    }

    fn redirect_rule(&self, op: char, addr: Address, port: u16) -> String {
        format!(
            "-{op} {chain} -j REDIRECT --dest {ip}/32 -p {proto} --to-ports {port} -m ttl ! --ttl {BYPASS_TTL}",
            chain = self.chain,
            ip = addr.ip,
            proto = addr.proto,
        )
    }

    async fn ipt(&self, line: &str) {
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if let Err(e) = self.runner.run(&args).await {
            warn!(target: "slipway.nat.iptables", error = %e, "rule command failed");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    use crate::NatError;

    /// Records every rule line; optionally fails each call.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) lines: StdMutex<Vec<String>>,
        pub(crate) fail: bool,
    }

    impl Recorder {
        pub(crate) fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.lines.lock().unwrap())
        }
    }

    #[async_trait]
    impl RuleRunner for Recorder {
        async fn run(&self, args: &[String]) -> Result<(), NatError> {
            let line = args.join(" ");
            self.lines.lock().unwrap().push(line.clone());
            if self.fail {
                return Err(NatError::RuleCommand {
                    command: line,
                    reason: "exit code: 1".into(),
                });
            }
            Ok(())
        }
    }

    fn translator(fail: bool) -> (Translator, Arc<Recorder>) {
        let rec = Arc::new(Recorder {
            fail,
            ..Default::default()
        });
        (Translator::with_runner("SLIPWAY", rec.clone()), rec)
    }

    const VIP: Ipv4Addr = Ipv4Addr::new(10, 96, 0, 10);

    #[tokio::test]
    async fn enable_hooks_chain_with_loopback_bypass() {
        let (t, rec) = translator(false);
        t.enable().await;
        assert_eq!(
            rec.take(),
            vec![
                "-D OUTPUT -j SLIPWAY",
                "-D PREROUTING -j SLIPWAY",
                "-N SLIPWAY",
                "-F SLIPWAY",
                "-I OUTPUT 1 -j SLIPWAY",
                "-I PREROUTING 1 -j SLIPWAY",
                "-A SLIPWAY -j RETURN --dest 127.0.0.1/32 -p tcp",
            ]
        );
    }

    #[tokio::test]
    async fn forward_replaces_previous_port() {
        let (t, rec) = translator(false);

        t.forward_tcp(VIP, 1234).await;
        t.forward_tcp(VIP, 5678).await;

        assert_eq!(
            rec.take(),
            vec![
                "-A SLIPWAY -j REDIRECT --dest 10.96.0.10/32 -p tcp --to-ports 1234 -m ttl ! --ttl 42",
                "-D SLIPWAY -j REDIRECT --dest 10.96.0.10/32 -p tcp --to-ports 1234 -m ttl ! --ttl 42",
                "-A SLIPWAY -j REDIRECT --dest 10.96.0.10/32 -p tcp --to-ports 5678 -m ttl ! --ttl 42",
            ]
        );
        let mappings = t.mappings().await;
        assert_eq!(mappings.len(), 1);
        assert_eq!(
            mappings[&Address {
                proto: Protocol::Tcp,
                ip: VIP
            }],
            5678
        );
    }

    #[tokio::test]
    async fn protocols_are_independent_keys() {
        let (t, rec) = translator(false);

        t.forward_tcp(VIP, 1234).await;
        t.forward_udp(VIP, 1234).await;
        t.clear_tcp(VIP).await;

        let lines = rec.take();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("-p udp"));
        assert!(lines[2].starts_with("-D ") && lines[2].contains("-p tcp"));

        let keys: Vec<Address> = t.mappings().await.into_keys().collect();
        assert_eq!(
            keys,
            vec![Address {
                proto: Protocol::Udp,
                ip: VIP
            }]
        );
    }

    #[tokio::test]
    async fn clear_without_mapping_is_noop() {
        let (t, rec) = translator(false);
        t.clear_tcp(VIP).await;
        assert!(rec.take().is_empty());
    }

    #[tokio::test]
    async fn disable_tears_down_chain_and_forgets_mappings() {
        let (t, rec) = translator(false);
        t.forward_tcp(VIP, 1234).await;
        rec.take();

        t.disable().await;
        assert_eq!(
            rec.take(),
            vec![
                "-D OUTPUT -j SLIPWAY",
                "-D PREROUTING -j SLIPWAY",
                "-F SLIPWAY",
                "-X SLIPWAY",
            ]
        );
        assert!(t.mappings().await.is_empty());
    }

    #[tokio::test]
    async fn failing_commands_do_not_abort() {
        let (t, rec) = translator(true);
        t.enable().await;
        t.forward_tcp(VIP, 1234).await;

        assert_eq!(rec.take().len(), 8);
        assert_eq!(t.mappings().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_forwards_keep_one_rule_per_key() {
        let (t, rec) = translator(false);
        let t = Arc::new(t);

        let handles: Vec<_> = (0..16u16)
            .map(|i| {
                let t = Arc::clone(&t);
                tokio::spawn(async move { t.forward_tcp(VIP, 2000 + i).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        let lines = rec.take();
        let added = lines.iter().filter(|l| l.starts_with("-A")).count();
        let deleted = lines.iter().filter(|l| l.starts_with("-D")).count();
        assert_eq!(added - deleted, 1);
        assert_eq!(t.mappings().await.len(), 1);
    }
}
