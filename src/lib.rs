pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use scheduler::Scheduler;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists.");
        }
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    let serving = matches!(cli.command, None | Some(Commands::Serve));

    let prometheus_handle = if serving && config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config, serving)?;
    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    match cli.command {
        None | Some(Commands::Serve) => run_server(config, prometheus_handle).await,
        Some(Commands::Init) => Ok(()),
        Some(Commands::PruneHistory { days }) => cli::cmd_prune_history(&config, days).await,
        Some(Commands::History { email, limit }) => cli::cmd_history(&config, &email, limit).await,
        Some(Commands::Stats { email }) => cli::cmd_stats(&config, &email).await,
        Some(Commands::Sequences { email, limit }) => {
            cli::cmd_sequences(&config, &email, limit).await
        }
        Some(Commands::ResetPassword { email, password }) => {
            cli::cmd_reset_password(&config, &email, &password).await
        }
    }
}

fn init_tracing(config: &Config, serving: bool) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    if serving && config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("GeneVision v{} starting...", env!("CARGO_PKG_VERSION"));

    let history_config = config.history.clone();
    let server_enabled = config.server.enabled;
    let port = config.server.port;

    let shared = Arc::new(SharedState::new(config).await?);

    let scheduler = Arc::new(Scheduler::new(
        shared.history_service.clone(),
        history_config,
    ));
    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    let server_handle: Option<tokio::task::JoinHandle<()>> = if server_enabled {
        info!("Starting Web API on port {}", port);

        let api_state = api::create_app_state(shared, prometheus_handle);
        let app = api::router(api_state).await;
        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        Some(tokio::spawn(async move {
            info!("Web server running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;
    scheduler_handle.abort();
    if let Some(handle) = server_handle {
        handle.abort();
    }
    info!("Stopped");

    Ok(())
}
