use std::error::Error;

use tokio::net::TcpListener;
use tracing::{error, info};
use trident_server::{Server, ServerConfig, network};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    let server = Server::start(config)?;

    network::serve(server.clone(), listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
        }
    })
    .await;

    server.shutdown();

    // Joining blocks until queued tasks have drained.
    let worker = server.clone();
    tokio::task::spawn_blocking(move || worker.join()).await?;

    info!("Server stopped");
    Ok(())
}
