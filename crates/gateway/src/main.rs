//! CardForge API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Upload registration and generation kickoff (local and remote strategy)
//! - Worker callbacks
//! - Review grading and suggestion triage
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    routing::{get, patch, post},
    Router,
};
use cardforge_common::{
    config::AppConfig,
    db::DbPool,
    metrics,
    storage::{create_document_store, DocumentStore},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub store: Arc<dyn DocumentStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting CardForge API Gateway v{}", cardforge_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();

    // Initialize document store
    let store = create_document_store(&config.storage)?;

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        store,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Upload endpoints
        .route("/uploads", post(handlers::uploads::create_upload))
        .route("/uploads", get(handlers::uploads::list_uploads))
        .route("/uploads/{id}/status", get(handlers::uploads::upload_status))

        // Generation endpoints
        .route("/uploads/{id}/generate", post(handlers::generate::generate))
        .route("/uploads/{id}/dispatch", post(handlers::generate::dispatch))
        .route("/remote/callback", post(handlers::callback::callback))

        // Job endpoints
        .route("/jobs/{upload_id}", get(handlers::jobs::get_job))

        // Review endpoints
        .route("/cards/{id}/review", post(handlers::review::review_card))

        // Deck endpoints
        .route("/decks/{id}/cards", get(handlers::decks::list_cards))

        // Suggestion triage endpoints
        .route("/suggestions", get(handlers::suggestions::list_suggestions))
        .route(
            "/suggestions/{id}/accept",
            post(handlers::suggestions::accept_suggestion),
        )
        .route(
            "/suggestions/{id}",
            patch(handlers::suggestions::update_suggestion),
        );

    // Rate limiting (token bucket, applied to the whole API surface)
    let rate_limiter = state.config.rate_limit.enabled.then(|| {
        middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        )
    });

    // Compose the app
    let mut app = Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state);

    if let Some(limiter) = rate_limiter {
        app = app.layer(axum::middleware::from_fn(move |request, next| {
            let limiter = limiter.clone();
            async move {
                middleware::rate_limit::rate_limit_middleware(request, next, limiter).await
            }
        }));
    }

    app
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
