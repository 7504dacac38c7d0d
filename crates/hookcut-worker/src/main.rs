//! Workflow worker binary.

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hookcut_firestore::FirestoreStore;
use hookcut_queue::RedisEventBus;
use hookcut_remote::{HttpMailer, LogMailer, Mailer, ProcessingClient, RenderClient};
use hookcut_worker::{WorkerConfig, WorkflowContext, WorkflowEngine, WorkflowExecutor};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    init_tracing();
    info!("Starting hookcut-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    init_metrics();

    let executor = match build_executor(config).await {
        Ok(executor) => Arc::new(executor),
        Err(e) => {
            error!("Failed to start worker: {}", e);
            std::process::exit(1);
        }
    };

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

async fn build_executor(config: WorkerConfig) -> Result<WorkflowExecutor, Box<dyn std::error::Error>> {
    let store = Arc::new(FirestoreStore::from_env().await?);
    let bus = Arc::new(RedisEventBus::from_env()?);

    let mailer: Arc<dyn Mailer> = match HttpMailer::from_env()? {
        Some(mailer) => Arc::new(mailer),
        None => {
            warn!("MAIL_URL is not set; notification emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let ctx = Arc::new(WorkflowContext {
        config: config.clone(),
        store,
        events: bus.clone(),
        journal: bus.clone(),
        processing: Arc::new(ProcessingClient::from_env()?),
        renderer: Arc::new(RenderClient::from_env()?),
        mailer,
    });
    let engine = WorkflowEngine::new(ctx, bus.clone());

    Ok(WorkflowExecutor::new(config, bus, engine))
}

/// Prometheus scrape endpoint on `METRICS_PORT`, when set.
fn init_metrics() {
    let Some(port) = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
    else {
        return;
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => info!("Prometheus metrics listening on {}", addr),
        Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hookcut=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
