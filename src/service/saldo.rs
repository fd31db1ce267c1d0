//! Saldo Service
//!
//! Read-through cached queries and cache-invalidating mutations over a
//! [`SaldoRepository`], each wrapped in one observability session.
//!
//! Reads: session start → cache → repository → cache fill → success log.
//! Any repository failure goes through the error templates and the caller gets
//! the pre-classified [`ServiceError`].

use std::sync::Arc;

use tracing::Instrument;

use crate::cache::{CacheKey, CacheStore, ListScope, Paginated};
use crate::error::{Result, ServiceError};
use crate::failure::{
    handle_marshal_error, handle_notification_error, handle_repository_error,
    handle_repository_pagination_error,
};
use crate::models::{CreateSaldoRequest, PageQuery, UpdateSaldoRequest};
use crate::observability::{Field, Session, Telemetry};
use crate::service::{
    card_fragment, BalanceChanged, BalanceNotifier, RepositoryError, Saldo, SaldoChange,
    SaldoRepository, BALANCE_TOPIC,
};

/// Namespace of every cache key this service writes
pub const CACHE_NAMESPACE: &str = "saldo";

const FAILED_FIND_ALL: &str = "FAILED_FIND_ALL_SALDO";
const FAILED_FIND_ACTIVE: &str = "FAILED_FIND_ACTIVE_SALDO";
const FAILED_FIND_TRASHED: &str = "FAILED_FIND_TRASHED_SALDO";
const FAILED_FIND_BY_ID: &str = "FAILED_FIND_SALDO_BY_ID";
const FAILED_FIND_BY_CARD: &str = "FAILED_FIND_SALDO_BY_CARD";
const FAILED_CREATE: &str = "FAILED_CREATE_SALDO";
const FAILED_UPDATE: &str = "FAILED_UPDATE_SALDO";
const FAILED_TRASH: &str = "FAILED_TRASH_SALDO";
const FAILED_RESTORE: &str = "FAILED_RESTORE_SALDO";
const FAILED_MARSHAL_EVENT: &str = "FAILED_MARSHAL_SALDO_EVENT";
const FAILED_PUBLISH_EVENT: &str = "FAILED_PUBLISH_SALDO_EVENT";

/// Maps a repository failure to the error handed to callers.
fn classify(err: &RepositoryError, fallback: &str) -> ServiceError {
    match err {
        RepositoryError::NotFound(_) => ServiceError::not_found("Saldo not found"),
        RepositoryError::Conflict(_) => {
            ServiceError::bad_request("A saldo already exists for this card")
        }
        RepositoryError::Storage(_) => ServiceError::internal(fallback),
    }
}

// == Saldo Service ==
pub struct SaldoService {
    repository: Arc<dyn SaldoRepository>,
    notifier: Arc<dyn BalanceNotifier>,
    cache: CacheStore,
    telemetry: Telemetry,
}

impl SaldoService {
    pub fn new(
        repository: Arc<dyn SaldoRepository>,
        notifier: Arc<dyn BalanceNotifier>,
        cache: CacheStore,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            repository,
            notifier,
            cache,
            telemetry,
        }
    }

    // == Queries ==
    /// All saldos, trashed included.
    pub async fn find_all(&self, query: &PageQuery) -> Result<Paginated<Saldo>> {
        self.find_page("FindAll", FAILED_FIND_ALL, ListScope::All, query)
            .await
    }

    pub async fn find_by_active(&self, query: &PageQuery) -> Result<Paginated<Saldo>> {
        self.find_page("FindByActive", FAILED_FIND_ACTIVE, ListScope::Active, query)
            .await
    }

    pub async fn find_by_trashed(&self, query: &PageQuery) -> Result<Paginated<Saldo>> {
        self.find_page("FindByTrashed", FAILED_FIND_TRASHED, ListScope::Trashed, query)
            .await
    }

    pub async fn find_by_id(&self, saldo_id: i32) -> Result<Saldo> {
        let fields = [Field::new("saldo.id", saldo_id)];
        let key = CacheKey::by_id(CACHE_NAMESPACE, saldo_id);
        self.find_one("FindById", FAILED_FIND_BY_ID, key, &fields, || {
            self.repository.find_by_id(saldo_id)
        })
        .await
    }

    pub async fn find_by_card_number(&self, card_number: &str) -> Result<Saldo> {
        let fields = [Field::new("card.suffix", card_fragment(card_number))];
        let key = CacheKey::by_key(CACHE_NAMESPACE, card_number);
        self.find_one("FindByCardNumber", FAILED_FIND_BY_CARD, key, &fields, || {
            self.repository.find_by_card_number(card_number)
        })
        .await
    }

    async fn find_page(
        &self,
        method: &'static str,
        trace_prefix: &'static str,
        scope: ListScope,
        query: &PageQuery,
    ) -> Result<Paginated<Saldo>> {
        let query = query.normalized();
        let fields = [
            Field::new("page", query.page),
            Field::new("page_size", query.page_size),
            Field::new("search", &query.search),
        ];
        let mut session = self.telemetry.start(method, &fields);
        let key = CacheKey::list(CACHE_NAMESPACE, scope, &query);

        if let Some(page) = self
            .cache
            .get::<Paginated<Saldo>>(&key)
            .instrument(session.context())
            .await
        {
            session.log_success("Fetched saldos from cache", &fields);
            return Ok(page);
        }

        let found = self
            .repository
            .find_all(scope, &query)
            .instrument(session.context())
            .await;

        match found {
            Ok((items, total)) => {
                let page = Paginated::new(items, total);
                self.cache
                    .set(&key, &page, None)
                    .instrument(session.context())
                    .await;
                session.log_success("Fetched saldos", &fields);
                Ok(page)
            }
            Err(err) => {
                let failure = handle_repository_pagination_error::<Vec<Saldo>, _>(
                    &session.error_context(trace_prefix, &fields),
                    &err,
                    classify(&err, "Failed to fetch saldos"),
                );
                let (_, error) = session.fail(failure);
                Err(error)
            }
        }
    }

    async fn find_one<F, Fut>(
        &self,
        method: &'static str,
        trace_prefix: &'static str,
        key: CacheKey,
        fields: &[Field],
        load: F,
    ) -> Result<Saldo>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<Saldo, RepositoryError>>,
    {
        let mut session = self.telemetry.start(method, fields);

        if let Some(saldo) = self
            .cache
            .get::<Saldo>(&key)
            .instrument(session.context())
            .await
        {
            session.log_success("Fetched saldo from cache", fields);
            return Ok(saldo);
        }

        match load().instrument(session.context()).await {
            Ok(saldo) => {
                self.cache
                    .set(&key, &saldo, None)
                    .instrument(session.context())
                    .await;
                session.log_success("Fetched saldo", fields);
                Ok(saldo)
            }
            Err(err) => {
                let failure = handle_repository_error::<Option<Saldo>, _>(
                    &session.error_context(trace_prefix, fields),
                    &err,
                    classify(&err, "Failed to fetch saldo"),
                );
                let (_, error) = session.fail(failure);
                Err(error)
            }
        }
    }

    // == Mutations ==
    pub async fn create(&self, request: &CreateSaldoRequest) -> Result<Saldo> {
        if let Some(message) = request.validate() {
            return Err(ServiceError::bad_request(message));
        }

        let fields = [
            Field::new("card.suffix", card_fragment(&request.card_number)),
            Field::new("total_balance", request.total_balance),
        ];
        let mut session = self.telemetry.start("CreateSaldo", &fields);

        let created = self
            .repository
            .create(request)
            .instrument(session.context())
            .await;
        let saldo = match created {
            Ok(saldo) => saldo,
            Err(err) => {
                let failure = handle_repository_error::<Option<Saldo>, _>(
                    &session.error_context(FAILED_CREATE, &fields),
                    &err,
                    classify(&err, "Failed to create saldo"),
                );
                return Err(session.fail(failure).1);
            }
        };

        // A cached miss for this card would otherwise outlive the insert.
        self.invalidate(&session, &saldo).await;
        self.publish(&mut session, "created", &saldo, &fields)
            .await?;

        session.log_success("Created saldo", &fields);
        Ok(saldo)
    }

    pub async fn update(&self, saldo_id: i32, request: &UpdateSaldoRequest) -> Result<Saldo> {
        if let Some(message) = request.validate() {
            return Err(ServiceError::bad_request(message));
        }

        let fields = [
            Field::new("saldo.id", saldo_id),
            Field::new("card.suffix", card_fragment(&request.card_number)),
            Field::new("total_balance", request.total_balance),
        ];
        let mut session = self.telemetry.start("UpdateSaldo", &fields);

        let updated = self
            .repository
            .update(saldo_id, request)
            .instrument(session.context())
            .await;
        let change = self.apply_change(&mut session, updated, FAILED_UPDATE, &fields, "Failed to update saldo")?;
        self.invalidate_change(&session, &change).await;
        self.publish(&mut session, "updated", &change.current, &fields)
            .await?;

        session.log_success("Updated saldo", &fields);
        Ok(change.current)
    }

    pub async fn trash(&self, saldo_id: i32) -> Result<Saldo> {
        let fields = [Field::new("saldo.id", saldo_id)];
        let mut session = self.telemetry.start("TrashSaldo", &fields);

        let trashed = self
            .repository
            .trash(saldo_id)
            .instrument(session.context())
            .await;
        let change = self.apply_change(&mut session, trashed, FAILED_TRASH, &fields, "Failed to trash saldo")?;
        self.invalidate_change(&session, &change).await;

        session.log_success("Trashed saldo", &fields);
        Ok(change.current)
    }

    pub async fn restore(&self, saldo_id: i32) -> Result<Saldo> {
        let fields = [Field::new("saldo.id", saldo_id)];
        let mut session = self.telemetry.start("RestoreSaldo", &fields);

        let restored = self
            .repository
            .restore(saldo_id)
            .instrument(session.context())
            .await;
        let change = self.apply_change(&mut session, restored, FAILED_RESTORE, &fields, "Failed to restore saldo")?;
        self.invalidate_change(&session, &change).await;

        session.log_success("Restored saldo", &fields);
        Ok(change.current)
    }

    fn apply_change(
        &self,
        session: &mut Session,
        outcome: std::result::Result<SaldoChange, RepositoryError>,
        trace_prefix: &str,
        fields: &[Field],
        fallback: &str,
    ) -> Result<SaldoChange> {
        outcome.map_err(|err| {
            let failure = handle_repository_error::<Option<Saldo>, _>(
                &session.error_context(trace_prefix, fields),
                &err,
                classify(&err, fallback),
            );
            session.fail(failure).1
        })
    }

    // == Invalidation ==
    async fn invalidate(&self, session: &Session, saldo: &Saldo) {
        let id_key = CacheKey::by_id(CACHE_NAMESPACE, saldo.saldo_id);
        let card_key = CacheKey::by_key(CACHE_NAMESPACE, &saldo.card_number);
        self.cache
            .delete(&id_key)
            .instrument(session.context())
            .await;
        self.cache
            .delete(&card_key)
            .instrument(session.context())
            .await;
    }

    async fn invalidate_change(&self, session: &Session, change: &SaldoChange) {
        self.invalidate(session, &change.current).await;
        if change.previous.card_number != change.current.card_number {
            let stale = CacheKey::by_key(CACHE_NAMESPACE, &change.previous.card_number);
            self.cache
                .delete(&stale)
                .instrument(session.context())
                .await;
        }
    }

    // == Notification ==
    async fn publish(
        &self,
        session: &mut Session,
        kind: &str,
        saldo: &Saldo,
        fields: &[Field],
    ) -> Result<()> {
        let payload = match serde_json::to_vec(&BalanceChanged::new(kind, saldo)) {
            Ok(payload) => payload,
            Err(err) => {
                let failure = handle_marshal_error::<(), _>(
                    &session.error_context(FAILED_MARSHAL_EVENT, fields),
                    &err,
                    ServiceError::internal("Failed to encode balance event"),
                );
                return Err(session.fail(failure).1);
            }
        };

        let published = self
            .notifier
            .publish(BALANCE_TOPIC, payload)
            .instrument(session.context())
            .await;
        if let Err(err) = published {
            let failure = handle_notification_error::<(), _>(
                &session.error_context(FAILED_PUBLISH_EVENT, fields),
                &err,
                ServiceError::internal("Failed to publish balance event"),
            );
            return Err(session.fail(failure).1);
        }
        Ok(())
    }
}
