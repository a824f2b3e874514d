//! HTTP server for the swapdesk API

use std::future::Future;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::routes::create_router;
use crate::AppState;

/// Router with CORS and request tracing applied
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the API on the configured host and port until `shutdown` resolves
pub async fn start_server<S>(state: AppState, shutdown: S) -> Result<(), std::io::Error>
where
    S: Future<Output = ()> + Send + 'static,
{
    let host = state.config().api_host.clone();
    let port = state.config().api_port;
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;

    tracing::info!(
        chain = %chain_label(&state),
        "Swapdesk API listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Swapdesk API stopped");
    Ok(())
}

/// "simulated" or the RPC endpoint the gateway talks to
pub(crate) fn chain_label(state: &AppState) -> String {
    let chain = &state.config().chain;
    if chain.simulated {
        "simulated".to_string()
    } else {
        chain.rpc_url.clone()
    }
}
