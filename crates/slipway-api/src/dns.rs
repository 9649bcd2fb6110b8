use async_trait::async_trait;
use tracing::debug;

/// Invalidates resolver caches after the route tables changed.
#[async_trait]
pub trait DnsFlush: Send + Sync + 'static {
    async fn flush(&self);
}

/// Flushes the host resolver cache where the platform keeps one.
///
/// On macOS `mDNSResponder` is told to drop its cache; elsewhere this is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFlusher;

#[async_trait]
impl DnsFlush for SystemFlusher {
    async fn flush(&self) {
        flush_system_cache().await;
    }
}

#[cfg(target_os = "macos")]
async fn flush_system_cache() {
    let status = tokio::process::Command::new("killall")
        .args(["-HUP", "mDNSResponder"])
        .status()
        .await;
    match status {
        Ok(status) if status.success() => debug!("dns cache flushed"),
        Ok(status) => tracing::warn!(%status, "dns cache flush failed"),
        Err(e) => tracing::warn!(error = %e, "dns cache flush failed"),
    }
}

#[cfg(not(target_os = "macos"))]
async fn flush_system_cache() {
    debug!("no resolver cache to flush on this platform");
}
