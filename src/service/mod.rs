//! Service Module
//!
//! Saldo (card balance) domain service built on the cache store, the
//! observability session and the error templates.

mod model;
mod notifier;
mod repository;
mod saldo;

pub use model::{card_fragment, BalanceChanged, Saldo, SaldoChange};
pub use notifier::{BalanceNotifier, LogNotifier, NotifyError, BALANCE_TOPIC};
pub use repository::{InMemorySaldoRepository, RepositoryError, SaldoRepository};
pub use saldo::{SaldoService, CACHE_NAMESPACE};
