use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use slipway_api::{HttpApi, Interceptor, InterceptorAdapter};
use slipway_core::{Subscribe, Supervisor, SupervisorConfig};
use slipway_daemon::{DaemonConfig, limits, tasks};
use slipway_nat::{Translator, translator_worker};
use slipway_observe::{Journal, logger_init};
use slipway_prometheus::PrometheusMetrics;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(n) => {
            eprintln!("slipwayd exited with {n} error(s)");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("slipwayd: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<usize> {
    // 1) Config + logger
    let cfg = DaemonConfig::from_env().context("reading configuration")?;
    logger_init(&cfg.logger).context("initializing logger")?;
    info!(chain = %cfg.chain, proxy_port = cfg.proxy_port, "starting slipwayd");

    match limits::raise_nofile(cfg.nofile) {
        Ok(soft) => info!(limit = soft, "open file limit set"),
        Err(e) => warn!(error = %e, "could not raise open file limit"),
    }

    // 2) Supervisor with logging and metrics subscribers
    let metrics = Arc::new(PrometheusMetrics::new().context("registering metrics")?);
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![
        Arc::new(Journal::with_capacity(cfg.event_queue)),
        metrics.clone(),
    ];
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .build();

    // 3) Shared state
    let store = Arc::new(Interceptor::new());
    let translator = Arc::new(Translator::new(cfg.chain.clone()));

    // 4) Control API
    let listener = TcpListener::bind(cfg.api_addr)
        .await
        .with_context(|| format!("binding control API on {}", cfg.api_addr))?;
    let api_addr = listener.local_addr()?;
    let adapter = Arc::new(InterceptorAdapter::new(Arc::clone(&store), sup.clone()));
    let router = HttpApi::new(adapter)
        .router()
        .merge(tasks::metrics_router(Arc::clone(&metrics)));

    // 5) Workers
    sup.supervise(tasks::signal_worker())?;
    sup.supervise(translator_worker(Arc::clone(&translator)))?;
    sup.supervise(tasks::redirect_worker(
        Arc::clone(&store),
        Arc::clone(&translator),
        cfg.proxy_port,
    ))?;
    sup.supervise(tasks::api_worker(listener, router))?;
    sup.supervise(tasks::probe_worker(format!("http://{api_addr}")))?;

    for unsatisfied in sup.unsatisfied() {
        warn!(error = %unsatisfied, "worker can never start");
    }

    // 6) Run until every worker terminated
    let failures = sup.run().await;
    for failure in &failures {
        error!(task = %failure.task, error = %failure.error, "worker failed");
        eprintln!("{failure}");
    }
    info!(errors = failures.len(), "slipwayd stopped");
    Ok(failures.len())
}
