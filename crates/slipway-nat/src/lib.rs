//! Kernel-level traffic redirection for virtual service addresses.
//!
//! The [`Translator`] owns a dedicated `nat` chain and keeps at most one redirect rule per
//! `(protocol, virtual IP)` pair. Connections arriving at the proxy port can recover the
//! address they were originally sent to with [`get_original_dst`].

mod error;
pub use error::NatError;

mod rules;
pub use rules::{IptablesRunner, RuleRunner};

mod translator;
pub use translator::{Address, Translator};

mod origdst;
pub use origdst::OriginalDst;
#[cfg(unix)]
pub use origdst::get_original_dst;

mod worker;
pub use worker::{WORKER_NAME, translator_worker};
