//! Outbound balance notifications.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Topic balance change events are published on
pub const BALANCE_TOPIC: &str = "saldo-balance-changed";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },
}

/// Sink for balance change events, e.g. a message broker producer.
#[async_trait]
pub trait BalanceNotifier: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), NotifyError>;
}

/// Notifier that only logs the topic and payload size. The payload carries
/// the card number, so it never reaches the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl BalanceNotifier for LogNotifier {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), NotifyError> {
        info!(topic, bytes = payload.len(), "Published balance event");
        Ok(())
    }
}
