//! Append-only service log. Non-authoritative: a logging failure must
//! never propagate as a job failure, so every write here is best-effort.

use std::collections::HashMap;

use adreel_models::service_log::{ServiceLogEntry, ServiceLogOutcome};
use tracing::warn;

use crate::client::StoreClient;
use crate::types::ToFirestoreValue;

const COLLECTION: &str = "service_log";

pub struct ServiceLogRepository {
    client: StoreClient,
}

impl ServiceLogRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Record one dispatch outcome. Swallows errors after logging a
    /// warning — telemetry must never fail the job it describes.
    pub async fn append(&self, entry: ServiceLogEntry) {
        let mut fields = HashMap::new();
        fields.insert("batch_id".to_string(), entry.batch_id.to_firestore_value());
        fields.insert("job_id".to_string(), entry.job_id.to_firestore_value());
        fields.insert("job_type".to_string(), entry.job_type.as_str().to_string().to_firestore_value());
        fields.insert(
            "outcome".to_string(),
            match entry.outcome {
                ServiceLogOutcome::Success => "success",
                ServiceLogOutcome::Retried => "retried",
                ServiceLogOutcome::Failed => "failed",
            }
            .to_string()
            .to_firestore_value(),
        );
        fields.insert("duration_ms".to_string(), (entry.duration_ms as i64).to_firestore_value());
        fields.insert("provider".to_string(), entry.provider.clone().to_firestore_value());
        fields.insert("error".to_string(), entry.error.clone().to_firestore_value());
        fields.insert("created_at".to_string(), entry.created_at.to_firestore_value());

        if let Err(e) = self.client.create_document(COLLECTION, &entry.id, fields).await {
            warn!(job_id = %entry.job_id, error = %e, "service log write failed (non-fatal)");
        }
    }
}
