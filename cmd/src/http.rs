use axum::routing::{get, post};
use axum::Router;
use color_eyre::eyre::Result;
use std::net::SocketAddr;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

use super::api::{self, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ds/query", post(api::query))
        .route("/api/health", get(api::health))
        .route("/api/live/:path", get(api::live))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

pub async fn server(addr: SocketAddr, state: AppState) -> Result<()> {
    tracing::info!("start http server: {:?}", addr);
    axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "failed to listen for shutdown signal");
            }
        })
        .await?;
    Ok(())
}
