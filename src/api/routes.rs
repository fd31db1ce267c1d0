//! API Routes
//!
//! Configures the Axum router with the saldo and operational endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, create_handler, find_active_handler, find_all_handler,
    find_by_card_handler, find_by_id_handler, find_trashed_handler, health_handler,
    metrics_handler, restore_handler, trash_handler, update_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /metrics` - Prometheus text exposition
/// - `GET /cache/stats` - Cache effectiveness counters
/// - `GET|POST /api/saldos` - List all saldos / create one
/// - `GET /api/saldos/active`, `GET /api/saldos/trashed` - Scoped listings
/// - `GET|PUT /api/saldos/:id` - Fetch / update by id
/// - `GET /api/saldos/card/:card_number` - Fetch by card number
/// - `POST /api/saldos/:id/trash`, `POST /api/saldos/:id/restore` - Soft delete / undo
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: One span per request
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let saldos = Router::new()
        .route("/", get(find_all_handler).post(create_handler))
        .route("/active", get(find_active_handler))
        .route("/trashed", get(find_trashed_handler))
        .route("/card/:card_number", get(find_by_card_handler))
        .route("/:id", get(find_by_id_handler).put(update_handler))
        .route("/:id/trash", post(trash_handler))
        .route("/:id/restore", post(restore_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .nest("/api/saldos", saldos)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
