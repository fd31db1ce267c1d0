//! Gateway Core - service substrate for payment gateway domain services
//!
//! Read-through caching, per-operation observability sessions and uniform
//! error templates, plus a saldo (card balance) service built on top of them.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod failure;
pub mod models;
pub mod observability;
pub mod service;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheStore;
pub use config::Config;
pub use error::{CacheFault, ServiceError};
pub use observability::{Session, Telemetry};
pub use tasks::spawn_cleanup_task;
