//! Saldo repository port and its in-memory adapter.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::cache::ListScope;
use crate::models::{CreateSaldoRequest, PageQuery, UpdateSaldoRequest};
use crate::service::{card_fragment, Saldo, SaldoChange};

/// Failure of the system of record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

/// System of record for saldos.
#[async_trait]
pub trait SaldoRepository: Send + Sync {
    /// One page of saldos in `scope` matching `query.search`, plus the total match count.
    async fn find_all(
        &self,
        scope: ListScope,
        query: &PageQuery,
    ) -> Result<(Vec<Saldo>, i64), RepositoryError>;

    async fn find_by_id(&self, saldo_id: i32) -> Result<Saldo, RepositoryError>;

    async fn find_by_card_number(&self, card_number: &str) -> Result<Saldo, RepositoryError>;

    async fn create(&self, request: &CreateSaldoRequest) -> Result<Saldo, RepositoryError>;

    async fn update(
        &self,
        saldo_id: i32,
        request: &UpdateSaldoRequest,
    ) -> Result<SaldoChange, RepositoryError>;

    async fn trash(&self, saldo_id: i32) -> Result<SaldoChange, RepositoryError>;

    async fn restore(&self, saldo_id: i32) -> Result<SaldoChange, RepositoryError>;
}

// == In-Memory Repository ==
#[derive(Debug, Default)]
struct Records {
    next_id: i32,
    saldos: BTreeMap<i32, Saldo>,
}

/// Repository keeping saldos in process memory. Counts reads so callers can
/// see how many requests the cache absorbed.
#[derive(Debug, Default)]
pub struct InMemorySaldoRepository {
    records: RwLock<Records>,
    reads: AtomicUsize,
}

impl InMemorySaldoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    async fn change(
        &self,
        saldo_id: i32,
        apply: impl FnOnce(&mut Saldo) -> Result<(), RepositoryError> + Send,
    ) -> Result<SaldoChange, RepositoryError> {
        let mut records = self.records.write().await;
        let saldo = records
            .saldos
            .get_mut(&saldo_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("saldo {saldo_id}")))?;
        let previous = saldo.clone();
        apply(saldo)?;
        saldo.updated_at = Utc::now();
        Ok(SaldoChange {
            previous,
            current: saldo.clone(),
        })
    }
}

#[async_trait]
impl SaldoRepository for InMemorySaldoRepository {
    async fn find_all(
        &self,
        scope: ListScope,
        query: &PageQuery,
    ) -> Result<(Vec<Saldo>, i64), RepositoryError> {
        self.record_read();
        let query = query.normalized();
        let records = self.records.read().await;

        let matching: Vec<&Saldo> = records
            .saldos
            .values()
            .filter(|saldo| match scope {
                ListScope::All => true,
                ListScope::Active => !saldo.is_trashed(),
                ListScope::Trashed => saldo.is_trashed(),
            })
            .filter(|saldo| query.search.is_empty() || saldo.card_number.contains(&query.search))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn find_by_id(&self, saldo_id: i32) -> Result<Saldo, RepositoryError> {
        self.record_read();
        self.records
            .read()
            .await
            .saldos
            .get(&saldo_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("saldo {saldo_id}")))
    }

    async fn find_by_card_number(&self, card_number: &str) -> Result<Saldo, RepositoryError> {
        self.record_read();
        self.records
            .read()
            .await
            .saldos
            .values()
            .find(|saldo| saldo.card_number == card_number)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::NotFound(format!(
                    "saldo for card ending {}",
                    card_fragment(card_number)
                ))
            })
    }

    async fn create(&self, request: &CreateSaldoRequest) -> Result<Saldo, RepositoryError> {
        let mut records = self.records.write().await;
        if records
            .saldos
            .values()
            .any(|saldo| saldo.card_number == request.card_number)
        {
            return Err(RepositoryError::Conflict(format!(
                "saldo for card ending {}",
                card_fragment(&request.card_number)
            )));
        }

        records.next_id += 1;
        let now = Utc::now();
        let saldo = Saldo {
            saldo_id: records.next_id,
            card_number: request.card_number.clone(),
            total_balance: request.total_balance,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        records.saldos.insert(saldo.saldo_id, saldo.clone());
        Ok(saldo)
    }

    async fn update(
        &self,
        saldo_id: i32,
        request: &UpdateSaldoRequest,
    ) -> Result<SaldoChange, RepositoryError> {
        let card_number = request.card_number.clone();
        let total_balance = request.total_balance;
        self.change(saldo_id, move |saldo| {
            saldo.card_number = card_number;
            saldo.total_balance = total_balance;
            Ok(())
        })
        .await
    }

    async fn trash(&self, saldo_id: i32) -> Result<SaldoChange, RepositoryError> {
        self.change(saldo_id, |saldo| {
            if saldo.is_trashed() {
                return Err(RepositoryError::NotFound(format!("active saldo {saldo_id}")));
            }
            saldo.deleted_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    async fn restore(&self, saldo_id: i32) -> Result<SaldoChange, RepositoryError> {
        self.change(saldo_id, |saldo| {
            if !saldo.is_trashed() {
                return Err(RepositoryError::NotFound(format!("trashed saldo {saldo_id}")));
            }
            saldo.deleted_at = None;
            Ok(())
        })
        .await
    }
}
