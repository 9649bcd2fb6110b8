use std::{collections::BTreeMap, net::Ipv4Addr, sync::Arc};

use slipway_api::Interceptor;
use slipway_core::{Process, TaskFn, Worker};
use slipway_nat::{Address, Translator, WORKER_NAME as NAT};
use tracing::{debug, info, warn};

pub const REDIRECT: &str = "redirect";

/// Brings the translator mappings in line with the redirect routes of `store`.
///
/// Every redirect route sends its virtual address to `proxy_port`. Routes whose address
/// is not IPv4 are skipped. Returns the number of rules installed and removed.
pub async fn converge(store: &Interceptor, translator: &Translator, proxy_port: u16) -> (usize, usize) {
    let mut desired = BTreeMap::new();
    for route in store.redirects() {
        match route.ip.parse::<Ipv4Addr>() {
            Ok(ip) => {
                desired.insert(Address { proto: route.proto, ip }, proxy_port);
            }
            Err(_) => warn!(route = %route.name, ip = %route.ip, "skipping non-IPv4 redirect"),
        }
    }

    let current = translator.mappings().await;
    let mut removed = 0;
    for addr in current.keys().filter(|addr| !desired.contains_key(addr)) {
        translator.clear(addr.proto, addr.ip).await;
        removed += 1;
    }

    let mut installed = 0;
    for (addr, port) in &desired {
        if current.get(addr) != Some(port) {
            translator.forward(addr.proto, addr.ip, *port).await;
            installed += 1;
        }
    }

    (installed, removed)
}

/// Re-converges after every change of the route tables. Ready after the first pass.
pub fn redirect_worker(store: Arc<Interceptor>, translator: Arc<Translator>, proxy_port: u16) -> Worker {
    let task = TaskFn::arc(REDIRECT, move |p: Process| {
        let store = Arc::clone(&store);
        let translator = Arc::clone(&translator);
        async move {
            let mut changes = store.subscribe();
            loop {
                changes.mark_unchanged();
                let (installed, removed) = converge(&store, &translator, proxy_port).await;
                if installed + removed > 0 {
                    info!(installed, removed, "redirect rules updated");
                } else {
                    debug!("redirect rules already up to date");
                }
                p.ready();

                tokio::select! {
                    res = changes.changed() => {
                        if res.is_err() {
                            return Ok(());
                        }
                    }
                    _ = p.cancelled() => return Ok(()),
                }
            }
        }
    });

    Worker::new(task).requires([NAT]).retry(true).explicit_ready()
}
