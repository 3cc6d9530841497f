use crate::api::{ApiServer, AppState};
use crate::config::Config;
use crate::gateway::{AiGateway, GeminiGateway};
use crate::interview::{MachineSettings, SessionRegistry};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub async fn run_service(config: Config) -> Result<()> {
    info!("Starting screener service");

    // Missing credentials are fatal at startup.
    let api_key = config.gemini.api_key()?;
    let gateway: Arc<dyn AiGateway> = Arc::new(
        GeminiGateway::new(api_key, &config.gemini, &config.interview)
            .context("Failed to initialize Gemini gateway")?,
    );
    info!("Using {} for interviews", gateway.name());

    let shutdown = CancellationToken::new();
    let registry = SessionRegistry::new(
        gateway,
        MachineSettings::from_config(&config),
        config.interview.allow_concurrent_sessions,
        shutdown.child_token(),
    )
    .with_retention(config.interview.max_retained_sessions);

    let state = AppState::new(registry)?;
    let api_server = ApiServer::new(state, &config.server);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown requested, cancelling in-flight interviews");
        signal_token.cancel();
    });

    info!("Screener is ready!");
    info!(
        "Open http://{}:{}/recruiter_report once an interview is complete",
        config.server.host, config.server.port
    );

    api_server.start(shutdown).await
}
