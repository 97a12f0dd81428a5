//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::ProvisionerError;
use crate::server::handlers::{
    create_handler, delete_handler, health_handler, image_handler, show_handler, task_handler,
    version_handler, API_PREFIX,
};
use crate::server::state::ServerState;

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    let icap = Router::new()
        .route(
            "/",
            get(show_handler).post(create_handler).delete(delete_handler),
        )
        .route("/image", get(image_handler))
        .route("/task/{id}", get(task_handler));

    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // ICAP lifecycle
        .nest(API_PREFIX, icap)
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), ProvisionerError>>, ProvisionerError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ProvisionerError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ProvisionerError::ServerError(e.to_string()))
    });

    Ok(handle)
}
