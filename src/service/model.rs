//! Saldo domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Balance held on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saldo {
    pub saldo_id: i32,
    pub card_number: String,
    pub total_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set while the saldo is trashed
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Saldo {
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A mutated record, before and after the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaldoChange {
    pub previous: Saldo,
    pub current: Saldo,
}

/// Message published whenever a balance is created or changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChanged {
    pub kind: String,
    pub saldo_id: i32,
    pub card_number: String,
    pub total_balance: i64,
    pub occurred_at: DateTime<Utc>,
}

impl BalanceChanged {
    pub fn new(kind: &str, saldo: &Saldo) -> Self {
        Self {
            kind: kind.to_string(),
            saldo_id: saldo.saldo_id,
            card_number: saldo.card_number.clone(),
            total_balance: saldo.total_balance,
            occurred_at: Utc::now(),
        }
    }
}

/// Last four characters of a card number, safe to put on spans and logs.
pub fn card_fragment(card_number: &str) -> String {
    let chars: Vec<char> = card_number.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}
