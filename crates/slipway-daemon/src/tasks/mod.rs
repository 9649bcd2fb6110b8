mod api;
pub use api::{API, api_worker, metrics_router};

mod redirect;
pub use redirect::{REDIRECT, converge, redirect_worker};

mod probe;
pub use probe::{PROBE, probe_worker};

mod signal;
pub use signal::{SIGNAL, signal_worker};
