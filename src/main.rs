use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use shipment_ledger::{
    api::{self, AppState},
    blockchain::ShipmentLedger,
    config::Config,
    fetcher::TimelineFetcher,
    mirror::MirrorNodeClient,
    storage::{UploadPolicy, Web3StorageClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let timeline = Arc::new(TimelineFetcher::new(
        Arc::new(MirrorNodeClient::new(&config)?),
        config.nft_token_id.clone(),
        config.topic_id.clone(),
    ));

    let state = AppState {
        timeline,
        ledger: Arc::new(ShipmentLedger::new(&config)?),
        storage: Arc::new(Web3StorageClient::new(&config)?),
        upload_policy: UploadPolicy::default(),
    };

    let addr: SocketAddr = config.bind_addr.parse()
        .with_context(|| format!("BIND_ADDR is not a socket address: {}", config.bind_addr))?;

    tracing::info!(
        %addr,
        token_id = %config.nft_token_id,
        topic_id = %config.topic_id,
        mirror = %config.mirror_url,
        network = %config.network,
        ledger_writes = config.operator.is_some(),
        "starting shipment ledger gateway"
    );

    axum::Server::bind(&addr)
        .serve(api::router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server crashed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
