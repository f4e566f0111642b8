pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::application::SessionRegistry;
use crate::config::AppConfig;
use crate::shutdown::shutdown_signal;

pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    serve(listener, config, shutdown_signal()).await
}

/// Serves on an already bound listener until `shutdown` resolves, then closes
/// every remaining session.
pub async fn serve<F>(listener: TcpListener, config: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (registry, consumer) = SessionRegistry::new();
    let moves = tokio::spawn(consumer.run());
    let app = routes::app_router(state::AppState::new(Arc::clone(&registry), config));

    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    registry.shutdown();
    moves.abort();
    Ok(())
}
