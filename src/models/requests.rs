//! Request DTOs for the saldo API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::{Deserialize, Serialize};

/// Request body for creating a saldo (POST /api/saldos)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSaldoRequest {
    pub card_number: String,
    pub total_balance: i64,
}

impl CreateSaldoRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_saldo(&self.card_number, self.total_balance)
    }
}

/// Request body for updating a saldo (PUT /api/saldos/:id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSaldoRequest {
    pub card_number: String,
    pub total_balance: i64,
}

impl UpdateSaldoRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_saldo(&self.card_number, self.total_balance)
    }
}

fn validate_saldo(card_number: &str, total_balance: i64) -> Option<String> {
    if card_number.trim().is_empty() {
        return Some("Card number cannot be empty".to_string());
    }
    if !card_number.chars().all(|c| c.is_ascii_digit()) {
        return Some("Card number must contain digits only".to_string());
    }
    if total_balance < 0 {
        return Some("Total balance cannot be negative".to_string());
    }
    None
}
