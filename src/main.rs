use anyhow::Result;
use axum::Router;
use content_vault::{
    config::AppConfig,
    routes::routes::routes,
    services::{
        content_client::ContentClient,
        ipfs_http::IpfsHttpConnector,
        memory::{MemoryConnector, MemoryNetwork},
        network::NetworkConnector,
    },
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting content-vault with config: {:?}", cfg);

    // --- Initialize storage client (connection is built on first use) ---
    let connector: Arc<dyn NetworkConnector> = if cfg.memory_network {
        tracing::warn!("Using in-memory storage network; uploads are lost on exit");
        Arc::new(MemoryConnector::new(Arc::new(MemoryNetwork::new())))
    } else {
        Arc::new(IpfsHttpConnector)
    };
    let client = ContentClient::new(connector, cfg.gateway.clone())
        .with_context(cfg.execution_context, cfg.context_policy);

    // --- Build router ---
    let app: Router = routes(cfg.max_upload_bytes).with_state(client);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
