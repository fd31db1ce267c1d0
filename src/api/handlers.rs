//! API Handlers
//!
//! HTTP request handlers for the saldo API and the operational endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::cache::{CacheBackend, CacheStore, Paginated};
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    ApiResponse, CacheStatsResponse, CreateSaldoRequest, HealthResponse, PageQuery,
    PaginatedResponse, PaginationMeta, UpdateSaldoRequest,
};
use crate::observability::{MetricsError, MetricsRegistry, OperationMetrics, Telemetry, Tracer};
use crate::service::{InMemorySaldoRepository, LogNotifier, Saldo, SaldoService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SaldoService>,
    /// Shared cache, exposed for the stats endpoint
    pub cache: CacheStore,
    /// Registry rendered by the metrics endpoint
    pub metrics: MetricsRegistry,
}

impl AppState {
    pub fn new(service: Arc<SaldoService>, cache: CacheStore, metrics: MetricsRegistry) -> Self {
        Self {
            service,
            cache,
            metrics,
        }
    }

    /// Wires the saldo service from configuration.
    ///
    /// Uses the in-memory repository and the log notifier; the cache talks to
    /// `backend` and sessions report to `tracer`.
    ///
    /// # Arguments
    /// * `config` - Service name, cache TTL and timeout
    /// * `backend` - Cache backend shared by the process
    /// * `tracer` - Span factory for the operation sessions
    pub fn from_config(
        config: &Config,
        backend: Arc<dyn CacheBackend>,
        tracer: Arc<dyn Tracer>,
    ) -> std::result::Result<Self, MetricsError> {
        let metrics = MetricsRegistry::new();
        let operations = OperationMetrics::register(&metrics, &config.service_name)?;
        let cache = CacheStore::from_config(backend, config);
        let service = SaldoService::new(
            Arc::new(InMemorySaldoRepository::new()),
            Arc::new(LogNotifier),
            cache.clone(),
            Telemetry::new(tracer, operations),
        );
        Ok(Self::new(Arc::new(service), cache, metrics))
    }
}

fn paginated(
    message: &str,
    query: &PageQuery,
    page: Paginated<Saldo>,
) -> Json<PaginatedResponse<Saldo>> {
    let query = query.normalized();
    let meta = PaginationMeta::new(query.page, query.page_size, page.total);
    Json(PaginatedResponse::success(message, page.items, meta))
}

// == Saldo Queries ==
/// Handler for GET /api/saldos
pub async fn find_all_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<Saldo>>> {
    let page = state.service.find_all(&query).await?;
    Ok(paginated("Successfully fetched saldos", &query, page))
}

/// Handler for GET /api/saldos/active
pub async fn find_active_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<Saldo>>> {
    let page = state.service.find_by_active(&query).await?;
    Ok(paginated("Successfully fetched active saldos", &query, page))
}

/// Handler for GET /api/saldos/trashed
pub async fn find_trashed_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<Saldo>>> {
    let page = state.service.find_by_trashed(&query).await?;
    Ok(paginated("Successfully fetched trashed saldos", &query, page))
}

/// Handler for GET /api/saldos/:id
pub async fn find_by_id_handler(
    State(state): State<AppState>,
    Path(saldo_id): Path<i32>,
) -> Result<Json<ApiResponse<Saldo>>> {
    let saldo = state.service.find_by_id(saldo_id).await?;
    Ok(Json(ApiResponse::success("Successfully fetched saldo", saldo)))
}

/// Handler for GET /api/saldos/card/:card_number
pub async fn find_by_card_handler(
    State(state): State<AppState>,
    Path(card_number): Path<String>,
) -> Result<Json<ApiResponse<Saldo>>> {
    let saldo = state.service.find_by_card_number(&card_number).await?;
    Ok(Json(ApiResponse::success("Successfully fetched saldo", saldo)))
}

// == Saldo Mutations ==
/// Handler for POST /api/saldos
pub async fn create_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateSaldoRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Saldo>>)> {
    let saldo = state.service.create(&req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Successfully created saldo", saldo)),
    ))
}

/// Handler for PUT /api/saldos/:id
pub async fn update_handler(
    State(state): State<AppState>,
    Path(saldo_id): Path<i32>,
    Json(req): Json<UpdateSaldoRequest>,
) -> Result<Json<ApiResponse<Saldo>>> {
    let saldo = state.service.update(saldo_id, &req).await?;
    Ok(Json(ApiResponse::success("Successfully updated saldo", saldo)))
}

/// Handler for POST /api/saldos/:id/trash
pub async fn trash_handler(
    State(state): State<AppState>,
    Path(saldo_id): Path<i32>,
) -> Result<Json<ApiResponse<Saldo>>> {
    let saldo = state.service.trash(saldo_id).await?;
    Ok(Json(ApiResponse::success("Successfully trashed saldo", saldo)))
}

/// Handler for POST /api/saldos/:id/restore
pub async fn restore_handler(
    State(state): State<AppState>,
    Path(saldo_id): Path<i32>,
) -> Result<Json<ApiResponse<Saldo>>> {
    let saldo = state.service.restore(saldo_id).await?;
    Ok(Json(ApiResponse::success("Successfully restored saldo", saldo)))
}

// == Operational ==
/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let stats = state.cache.stats();

    Json(CacheStatsResponse {
        hits: stats.hits,
        misses: stats.misses,
        faults: stats.faults,
        writes: stats.writes,
        invalidations: stats.invalidations,
        hit_rate: stats.hit_rate(),
    })
}

/// Handler for GET /metrics
///
/// Renders the registry in the Prometheus text exposition format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}"),
        ),
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
