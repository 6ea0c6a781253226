use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aeroguard_core::{
    create_authenticator, load_config, open_queue, open_store, validate_config, Authenticator,
    DispatchRunner, DispatchWorker, HttpOptimizer, HttpStatusReporter, LocalStatusReporter,
    Optimizer, StatusReporter,
};
use aeroguard_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("AEROGUARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {}", config.auth.method.as_str());
    info!(
        "Status store: {} ({:?})",
        config.store.backend.as_str(),
        config.store.path
    );
    info!(
        "Job queue: {} ({:?})",
        config.queue.backend.as_str(),
        config.queue.path
    );

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );

    // Create status store and job queue
    let store = open_store(&config.store).context("Failed to open status store")?;
    info!("Status store initialized");

    let queue = open_queue(&config.queue).context("Failed to open job queue")?;
    info!("Job queue initialized");

    let reporter: Arc<dyn StatusReporter> = Arc::new(LocalStatusReporter::new(Arc::clone(&store)));

    // Workers either share this process's store or report to a remote API server
    let worker_reporter: Arc<dyn StatusReporter> = match &config.worker.status_url {
        Some(url) => {
            info!("Reporting statuses to {}", url);
            Arc::new(
                HttpStatusReporter::new(url.clone(), config.auth.api_key.clone())
                    .context("Failed to create status reporter")?,
            )
        }
        None => Arc::clone(&reporter),
    };

    // Create dispatch worker if an optimizer is configured
    let worker = match &config.optimizer.url {
        Some(url) => {
            info!("Using roster optimizer at {}", url);
            let optimizer: Arc<dyn Optimizer> = Arc::new(
                HttpOptimizer::new(url.clone(), config.optimizer.api_key.clone())
                    .context("Failed to create optimizer client")?,
            );
            Some(Arc::new(DispatchWorker::new(
                worker_reporter,
                optimizer,
                config.optimizer.timeout(),
                config.worker.concurrency,
            )))
        }
        None => {
            warn!("No optimizer configured, push deliveries will be refused");
            None
        }
    };

    // Start pull consumers if enabled
    let runner = match (&worker, config.worker.enabled) {
        (Some(worker), true) => {
            let runner = Arc::new(DispatchRunner::new(
                Arc::clone(worker),
                Arc::clone(&queue),
                config.worker.concurrency,
                config.queue.poll_interval(),
            ));
            runner.start().await;
            info!("Dispatch runner started");
            Some(runner)
        }
        _ => {
            info!("Dispatch runner disabled in config");
            None
        }
    };

    // Create app state
    let mut state = AppState::new(config.clone(), authenticator, store, reporter, queue);
    if let Some(ref worker) = worker {
        state = state.with_worker(Arc::clone(worker));
    }
    if let Some(ref runner) = runner {
        state = state.with_runner(Arc::clone(runner));
    }

    let app = create_router(Arc::new(state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // Let consumers finish the deliveries they hold
    if let Some(ref runner) = runner {
        info!("Stopping dispatch runner...");
        runner.stop().await;
    }

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
