use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use medguide_backend::core;
use medguide_backend::server;
use medguide_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    core::logging::init(&state.paths);
    state.spawn_startup_probe();

    let bind_addr = format!("0.0.0.0:{}", state.settings.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app: Router = server::router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
