//! Credit ledger: per-user prepaid balance and its transaction log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user prepaid balance. Invariant: `balance_cents >= 0` at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredits {
    pub user_id: String,
    pub balance_cents: i64,
    pub updated_at: DateTime<Utc>,
}

impl UserCredits {
    pub fn new(user_id: impl Into<String>, balance_cents: i64) -> Self {
        Self {
            user_id: user_id.into(),
            balance_cents,
            updated_at: Utc::now(),
        }
    }
}

/// A charge or refund against a user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditOperation {
    Charge,
    Refund,
}

/// Append-only log entry recording a balance mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: String,
    pub user_id: String,
    pub batch_id: String,
    pub operation: CreditOperation,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    pub fn new(
        user_id: impl Into<String>,
        batch_id: impl Into<String>,
        operation: CreditOperation,
        amount_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            batch_id: batch_id.into(),
            operation,
            amount_cents,
            created_at: Utc::now(),
        }
    }
}
