//! HTTP server setup and routing
//!
//! Axum router for junction observation, demand intake, override commands
//! and the SSE event stream.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use aspc_common::events::EventBus;
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::runtime::JunctionRegistry;

/// Shared application context passed to all handlers
///
/// Clone gives `FromRef<AppContext>` for free via axum's blanket impl.
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<JunctionRegistry>,
    pub event_bus: EventBus,
    pub started_at: DateTime<Utc>,
}

impl AppContext {
    pub fn new(registry: Arc<JunctionRegistry>, event_bus: EventBus) -> Self {
        Self {
            registry,
            event_bus,
            started_at: aspc_common::time::now(),
        }
    }
}

/// Build the router with all routes attached
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        // Junction observation
        .route("/junctions", get(super::handlers::list_junctions))
        .route("/junctions/:id/state", get(super::handlers::get_state))
        .route(
            "/junctions/:id/observe",
            post(super::handlers::start_observation).delete(super::handlers::stop_observation),
        )
        // Sensing input
        .route("/junctions/:id/demand", post(super::handlers::update_demand))
        // Override commands
        .route(
            "/junctions/:id/overrides",
            post(super::handlers::submit_override).get(super::handlers::list_overrides),
        )
        // Utilities
        .route("/pcu/convert", post(super::handlers::convert_pcu))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves
pub async fn run<F>(port: u16, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
