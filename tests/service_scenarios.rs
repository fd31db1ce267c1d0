//! End-to-end scenarios of the saldo service over the cache store, the
//! observability session and the error templates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateway_core::cache::{CacheKey, CacheStore, ListScope, MemoryBackend};
use gateway_core::models::{CreateSaldoRequest, PageQuery, UpdateSaldoRequest};
use gateway_core::observability::{
    MemoryTracer, MetricsRegistry, OperationMetrics, SpanStatus, Telemetry,
};
use gateway_core::service::{
    InMemorySaldoRepository, LogNotifier, RepositoryError, Saldo, SaldoChange, SaldoRepository,
    SaldoService, CACHE_NAMESPACE,
};
use gateway_core::ServiceError;

// == Helpers ==

/// Repository whose calls fail with a storage error, optionally after
/// stalling; counts calls.
#[derive(Default)]
struct BrokenRepository {
    calls: AtomicUsize,
    stall: Option<Duration>,
}

impl BrokenRepository {
    fn stalled(stall: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            stall: Some(stall),
        }
    }

    async fn fail<T>(&self) -> Result<T, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        Err(RepositoryError::Storage("connection reset by peer".to_string()))
    }
}

#[async_trait]
impl SaldoRepository for BrokenRepository {
    async fn find_all(
        &self,
        _scope: ListScope,
        _query: &PageQuery,
    ) -> Result<(Vec<Saldo>, i64), RepositoryError> {
        self.fail().await
    }

    async fn find_by_id(&self, _saldo_id: i32) -> Result<Saldo, RepositoryError> {
        self.fail().await
    }

    async fn find_by_card_number(&self, _card_number: &str) -> Result<Saldo, RepositoryError> {
        self.fail().await
    }

    async fn create(&self, _request: &CreateSaldoRequest) -> Result<Saldo, RepositoryError> {
        self.fail().await
    }

    async fn update(
        &self,
        _saldo_id: i32,
        _request: &UpdateSaldoRequest,
    ) -> Result<SaldoChange, RepositoryError> {
        self.fail().await
    }

    async fn trash(&self, _saldo_id: i32) -> Result<SaldoChange, RepositoryError> {
        self.fail().await
    }

    async fn restore(&self, _saldo_id: i32) -> Result<SaldoChange, RepositoryError> {
        self.fail().await
    }
}

struct Harness {
    service: SaldoService,
    cache: CacheStore,
    backend: Arc<MemoryBackend>,
    tracer: MemoryTracer,
    telemetry: Telemetry,
}

fn harness(repository: Arc<dyn SaldoRepository>) -> Harness {
    let backend = Arc::new(MemoryBackend::new(1_000));
    let cache = CacheStore::new(
        backend.clone(),
        Duration::from_secs(60),
        Duration::from_millis(250),
    );
    let tracer = MemoryTracer::new();
    let metrics = OperationMetrics::register(&MetricsRegistry::new(), "saldo").unwrap();
    let telemetry = Telemetry::new(Arc::new(tracer.clone()), metrics);
    let service = SaldoService::new(
        repository,
        Arc::new(LogNotifier),
        cache.clone(),
        telemetry.clone(),
    );
    Harness {
        service,
        cache,
        backend,
        tracer,
        telemetry,
    }
}

async fn seed(service: &SaldoService, count: usize) {
    for i in 0..count {
        service
            .create(&CreateSaldoRequest {
                card_number: format!("41110000{i:04}"),
                total_balance: 1_000 * (i as i64 + 1),
            })
            .await
            .unwrap();
    }
}

// == Scenarios ==

#[tokio::test]
async fn test_second_identical_read_is_served_from_cache() {
    let repository = Arc::new(InMemorySaldoRepository::new());
    let h = harness(repository.clone());
    seed(&h.service, 3).await;

    let first = h.service.find_by_id(2).await.unwrap();
    let second = h.service.find_by_id(2).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(repository.read_count(), 1);
    assert_eq!(h.cache.stats().hits, 1);
    assert_eq!(h.cache.stats().misses, 1);
}

#[tokio::test]
async fn test_repository_error_is_classified_and_counted_once() {
    let repository = Arc::new(BrokenRepository::default());
    let h = harness(repository.clone());

    let result = h.service.find_by_id(42).await;

    assert_eq!(result, Err(ServiceError::internal("Failed to fetch saldo")));
    assert_eq!(repository.calls.load(Ordering::SeqCst), 1);

    let metrics = h.telemetry.metrics();
    assert_eq!(
        metrics.request_count("FindById", "repository_error_FindById"),
        1
    );
    assert_eq!(metrics.request_count("FindById", "success"), 0);

    let span = &h.tracer.spans_named("FindById")[0];
    assert!(span.status.is_error());
    assert_eq!(span.errors, vec!["Storage failure: connection reset by peer".to_string()]);
    assert_eq!(span.end_count, 1);
}

#[tokio::test]
async fn test_failed_read_is_not_cached() {
    let repository = Arc::new(BrokenRepository::default());
    let h = harness(repository.clone());

    assert!(h.service.find_by_id(42).await.is_err());
    assert!(h.service.find_by_id(42).await.is_err());

    assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.cache.stats().writes, 0);
}

#[tokio::test]
async fn test_paginated_failure_uses_pagination_status() {
    let h = harness(Arc::new(BrokenRepository::default()));

    let result = h.service.find_by_active(&PageQuery::default()).await;

    assert!(matches!(result, Err(ServiceError::Internal(_))));
    assert_eq!(
        h.telemetry
            .metrics()
            .request_count("FindByActive", "pagination_error_FindByActive"),
        1
    );
}

#[tokio::test]
async fn test_mutation_invalidates_cached_id() {
    let repository = Arc::new(InMemorySaldoRepository::new());
    let h = harness(repository.clone());
    seed(&h.service, 7).await;

    h.service.find_by_id(7).await.unwrap();
    let key = CacheKey::by_id(CACHE_NAMESPACE, 7);
    assert!(h.cache.get::<Saldo>(&key).await.is_some());

    h.service
        .update(
            7,
            &UpdateSaldoRequest {
                card_number: "4111000000000006".to_string(),
                total_balance: 1,
            },
        )
        .await
        .unwrap();
    assert!(h.cache.get::<Saldo>(&key).await.is_none());

    let fresh = h.service.find_by_id(7).await.unwrap();
    assert_eq!(fresh.total_balance, 1);
    assert_eq!(repository.read_count(), 2);
}

#[tokio::test]
async fn test_cache_outage_degrades_to_repository_reads() {
    let repository = Arc::new(InMemorySaldoRepository::new());
    let h = harness(repository.clone());
    seed(&h.service, 1).await;
    h.backend.set_available(false);

    assert!(h.service.find_by_id(1).await.is_ok());
    assert!(h.service.find_by_id(1).await.is_ok());

    assert_eq!(repository.read_count(), 2);
    assert!(h.cache.stats().faults >= 2);
    assert_eq!(
        h.telemetry.metrics().request_count("FindById", "success"),
        2
    );
}

#[tokio::test]
async fn test_every_path_finalizes_exactly_once() {
    let repository = Arc::new(InMemorySaldoRepository::new());
    let h = harness(repository);
    seed(&h.service, 1).await;

    h.service.find_by_id(1).await.unwrap(); // miss
    h.service.find_by_id(1).await.unwrap(); // hit
    h.service.find_by_id(99).await.unwrap_err(); // error

    let spans = h.tracer.spans_named("FindById");
    assert_eq!(spans.len(), 3);
    assert!(spans.iter().all(|span| span.end_count == 1));
    assert_eq!(spans[0].status, SpanStatus::Ok);
    assert_eq!(spans[1].status, SpanStatus::Ok);
    assert!(spans[2].status.is_error());

    let metrics = h.telemetry.metrics();
    assert_eq!(metrics.duration_samples("FindById", "success"), 2);
    assert_eq!(
        metrics.duration_samples("FindById", "repository_error_FindById"),
        1
    );
}

#[tokio::test]
async fn test_concurrent_reads_keep_separate_statuses() {
    let repository = Arc::new(InMemorySaldoRepository::new());
    let h = Arc::new(harness(repository));
    seed(&h.service, 4).await;

    let mut handles = Vec::new();
    for id in 1..=8 {
        let h = h.clone();
        handles.push(tokio::spawn(async move { h.service.find_by_id(id).await }));
    }
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    let metrics = h.telemetry.metrics();
    assert_eq!(metrics.request_count("FindById", "success"), 4);
    assert_eq!(
        metrics.request_count("FindById", "repository_error_FindById"),
        4
    );
}

#[tokio::test]
async fn test_abandoned_read_is_recorded_as_cancelled() {
    let h = harness(Arc::new(BrokenRepository::stalled(Duration::from_secs(10))));

    let result = tokio::time::timeout(Duration::from_millis(100), h.service.find_by_id(1)).await;
    assert!(result.is_err());

    let metrics = h.telemetry.metrics();
    assert_eq!(metrics.request_count("FindById", "success"), 0);
    assert_eq!(metrics.request_count("FindById", "cancelled_FindById"), 1);

    let span = &h.tracer.spans_named("FindById")[0];
    assert!(span.status.is_error());
    assert_eq!(span.end_count, 1);
}
