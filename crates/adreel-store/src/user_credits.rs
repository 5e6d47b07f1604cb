//! User credit ledger: atomic `debit` at intake and idempotent
//! `refund_batch` on batch close.
//!
//! Both mutate a single `balance_cents` field on the user document and
//! use optimistic locking via Firestore's `updateTime` precondition, so
//! concurrent callers retry rather than lose an update.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{FromFirestoreValue, ToFirestoreValue};

/// Maximum retries for atomic credit operations (optimistic locking).
const MAX_CREDIT_RETRIES: u32 = 5;

/// Base delay for exponential backoff on retry (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 50;

/// Repository for the per-user credit balance.
pub struct UserCreditsRepository {
    client: StoreClient,
    user_id: String,
}

impl UserCreditsRepository {
    pub fn new(client: StoreClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn read_balance(&self) -> StoreResult<(i64, Option<String>)> {
        let doc = self.client.get_document("users", &self.user_id).await?;
        match doc {
            Some(d) => {
                let fields = d.fields.as_ref();
                let balance = fields
                    .and_then(|f| f.get("balance_cents"))
                    .and_then(i64::from_firestore_value)
                    .unwrap_or(0);
                Ok((balance, d.update_time))
            }
            None => Err(StoreError::NotFound(format!(
                "user {} not found",
                self.user_id
            ))),
        }
    }

    /// Atomically debit the user's balance by `cents`. Fails with
    /// `InsufficientCredits` (no write performed) if the balance read at
    /// the start of the attempt would go negative; retries on concurrent
    /// writer conflicts, never on insufficient funds.
    pub async fn debit(&self, cents: i64) -> StoreResult<i64> {
        let mut last_error = None;

        for attempt in 0..MAX_CREDIT_RETRIES {
            let (balance, update_time) = self.read_balance().await?;

            if balance < cents {
                return Err(StoreError::InsufficientCredits {
                    balance_cents: balance,
                    charge_cents: cents,
                });
            }

            let new_balance = balance - cents;
            match self.write_balance(new_balance, update_time.as_deref()).await {
                Ok(()) => {
                    info!(user_id = %self.user_id, cents, new_balance, "debited credits");
                    return Ok(new_balance);
                }
                Err(e) if e.is_precondition_failed() => {
                    debug!(user_id = %self.user_id, attempt = attempt + 1, "debit precondition failed, retrying");
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(
                        RETRY_BASE_DELAY_MS * (attempt as u64 + 1),
                    ))
                    .await;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(user_id = %self.user_id, error = ?last_error, "debit failed after retries");
        Err(StoreError::request_failed(
            "failed to debit credits due to concurrent updates",
        ))
    }

    /// Credit the user's balance by `cents` (used by `refund_batch`).
    /// Not itself idempotent — callers must guard with the batch's
    /// `refunded` flag.
    pub async fn credit(&self, cents: i64) -> StoreResult<i64> {
        let mut last_error = None;

        for attempt in 0..MAX_CREDIT_RETRIES {
            let (balance, update_time) = self.read_balance().await?;
            let new_balance = balance + cents;
            match self.write_balance(new_balance, update_time.as_deref()).await {
                Ok(()) => {
                    info!(user_id = %self.user_id, cents, new_balance, "credited refund");
                    return Ok(new_balance);
                }
                Err(e) if e.is_precondition_failed() => {
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(
                        RETRY_BASE_DELAY_MS * (attempt as u64 + 1),
                    ))
                    .await;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(user_id = %self.user_id, error = ?last_error, "refund failed after retries");
        Err(StoreError::request_failed(
            "failed to credit refund due to concurrent updates",
        ))
    }

    async fn write_balance(&self, new_balance: i64, update_time: Option<&str>) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("balance_cents".to_string(), new_balance.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        let update_mask = vec!["balance_cents".to_string(), "updated_at".to_string()];

        self.client
            .update_document_with_precondition(
                "users",
                &self.user_id,
                fields,
                Some(update_mask),
                update_time,
            )
            .await?;
        Ok(())
    }

    pub async fn get_balance(&self) -> StoreResult<i64> {
        let (balance, _) = self.read_balance().await?;
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_credits_error_carries_amounts() {
        let e = StoreError::InsufficientCredits {
            balance_cents: 100,
            charge_cents: 400,
        };
        assert!(e.to_string().contains("100"));
        assert!(e.to_string().contains("400"));
    }
}
