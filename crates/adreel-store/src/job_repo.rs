//! Job repository: claim/enqueue/finish plus the Scheduler's janitor
//! queries (stuck running jobs, terminal harvesting, old `done` purge).
//!
//! Jobs live in a `jobs` subcollection under their batch
//! (`batches/{batchId}/jobs/{jobId}`). `claim_next_job` needs the
//! globally-oldest queued job regardless of batch, so it runs a
//! collection-group query (`from: [{collectionId: "jobs", allDescendants:
//! true}]`) ordered by `created_at` rather than listing per batch.

use std::collections::HashMap;

use adreel_models::job::{Job, JobStatus, JobType, MAX_ATTEMPTS};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{
    CollectionSelector, Document, FieldReference, Filter, FromFirestoreValue, Order,
    StructuredQuery, ToFirestoreValue, Value,
};

const JOBS_COLLECTION_ID: &str = "jobs";

pub(crate) fn job_to_fields(j: &Job) -> HashMap<String, Value> {
    let mut f = HashMap::new();
    f.insert("batch_id".into(), j.batch_id.clone().to_firestore_value());
    f.insert("clip_id".into(), j.clip_id.clone().to_firestore_value());
    f.insert("job_type".into(), j.job_type.as_str().to_string().to_firestore_value());
    f.insert("status".into(), job_status_str(j.status).to_string().to_firestore_value());
    f.insert("attempts".into(), (j.attempts as i64).to_firestore_value());
    f.insert(
        "payload".into(),
        Value::StringValue(j.payload.to_string()),
    );
    f.insert("error".into(), j.error.clone().to_firestore_value());
    f.insert("created_at".into(), j.created_at.to_firestore_value());
    f.insert("updated_at".into(), j.updated_at.to_firestore_value());
    f
}

fn job_status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Done => "done",
        JobStatus::Failed => "failed",
    }
}

fn job_status_from_str(s: &str) -> JobStatus {
    match s {
        "running" => JobStatus::Running,
        "done" => JobStatus::Done,
        "failed" => JobStatus::Failed,
        _ => JobStatus::Queued,
    }
}

fn job_type_from_str(s: &str) -> Option<JobType> {
    Some(match s {
        "compile" => JobType::Compile,
        "tts" => JobType::Tts,
        "video" => JobType::Video,
        "assemble" => JobType::Assemble,
        "image_compile" => JobType::ImageCompile,
        "image" => JobType::Image,
        "research" => JobType::Research,
        _ => return None,
    })
}

fn job_from_document(doc: &Document) -> Option<Job> {
    let name = doc.name.as_deref()?;
    // .../batches/{batchId}/jobs/{jobId}
    let mut parts = name.rsplit('/');
    let id = parts.next()?.to_string();

    let fields = doc.fields.as_ref()?;
    let get_str = |k: &str| fields.get(k).and_then(String::from_firestore_value);
    let batch_id = get_str("batch_id")?;
    let payload = fields
        .get("payload")
        .and_then(String::from_firestore_value)
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(serde_json::Value::Null);

    Some(Job {
        id,
        batch_id,
        clip_id: get_str("clip_id"),
        job_type: job_type_from_str(&get_str("job_type").unwrap_or_default())?,
        status: job_status_from_str(&get_str("status").unwrap_or_default()),
        attempts: fields.get("attempts").and_then(u32::from_firestore_value).unwrap_or(0),
        payload,
        error: get_str("error"),
        created_at: fields
            .get("created_at")
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now),
        updated_at: fields
            .get("updated_at")
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now),
    })
}

pub struct JobRepository {
    client: StoreClient,
}

impl JobRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    fn jobs_collection(batch_id: &str) -> String {
        format!("batches/{}/jobs", batch_id)
    }

    pub async fn get(&self, batch_id: &str, job_id: &str) -> StoreResult<Option<Job>> {
        let doc = self.client.get_document(&Self::jobs_collection(batch_id), job_id).await?;
        Ok(doc.and_then(|d| job_from_document(&d)))
    }

    /// Returns true if a non-terminal job already exists for
    /// `(batch_id, clip_id, job_type)` — `enqueue` consults this to
    /// reject duplicate stage chaining.
    async fn has_open_job(&self, batch_id: &str, clip_id: Option<&str>, job_type: JobType) -> StoreResult<bool> {
        let jobs = self.client.run_query(StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: JOBS_COLLECTION_ID.to_string(),
                all_descendants: true,
            }],
            r#where: Some(Filter::and(vec![
                Filter::eq("batch_id", Value::StringValue(batch_id.to_string())),
                Filter::eq("job_type", Value::StringValue(job_type.as_str().to_string())),
            ])),
            order_by: None,
            limit: Some(50),
        }).await?;

        Ok(jobs.iter().filter_map(job_from_document).any(|j| {
            j.clip_id.as_deref() == clip_id && j.status.is_open()
        }))
    }

    /// Insert a new queued job. Rejects with `StoreError::DuplicateJob`
    /// if a non-terminal job already exists for the same
    /// (batch_id, clip_id, type) — stage chaining must never fan out
    /// two jobs for the same next step.
    pub async fn enqueue(&self, job: Job) -> StoreResult<Job> {
        if self.has_open_job(&job.batch_id, job.clip_id.as_deref(), job.job_type).await? {
            return Err(StoreError::DuplicateJob(job.dedup_key()));
        }

        self.client
            .create_document(&Self::jobs_collection(&job.batch_id), &job.id, job_to_fields(&job))
            .await?;
        Ok(job)
    }

    /// Claim the globally-oldest queued job, incrementing `attempts`
    /// and moving it to `running`. Races against other callers via the
    /// `updateTime` precondition: only one caller's optimistic write
    /// against a given document will succeed, so on a collision this
    /// moves on to the next candidate rather than retrying the same one.
    pub async fn claim_next_job(&self) -> StoreResult<Option<Job>> {
        let candidates = self.client.run_query(StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: JOBS_COLLECTION_ID.to_string(),
                all_descendants: true,
            }],
            r#where: Some(Filter::eq("status", Value::StringValue("queued".to_string()))),
            order_by: Some(vec![Order {
                field: FieldReference { field_path: "created_at".to_string() },
                direction: "ASCENDING".to_string(),
            }]),
            limit: Some(20),
        }).await?;

        for doc in &candidates {
            let Some(job) = job_from_document(doc) else { continue };
            if job.status != JobStatus::Queued {
                continue;
            }

            let mut fields = HashMap::new();
            fields.insert("status".to_string(), job_status_str(JobStatus::Running).to_string().to_firestore_value());
            fields.insert("attempts".to_string(), ((job.attempts + 1) as i64).to_firestore_value());
            fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
            let mask = vec!["status".to_string(), "attempts".to_string(), "updated_at".to_string()];

            match self
                .client
                .update_document_with_precondition(
                    &Self::jobs_collection(&job.batch_id),
                    &job.id,
                    fields,
                    Some(mask),
                    doc.update_time.as_deref(),
                )
                .await
            {
                Ok(_) => {
                    let mut claimed = job;
                    claimed.status = JobStatus::Running;
                    claimed.attempts += 1;
                    return Ok(Some(claimed));
                }
                Err(e) if e.is_precondition_failed() => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    pub async fn mark_done(&self, job: &Job) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), job_status_str(JobStatus::Done).to_string().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        self.client
            .update_document(
                &Self::jobs_collection(&job.batch_id),
                &job.id,
                fields,
                Some(vec!["status".to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Persist an updated payload without touching status or attempts.
    /// Used by the `video` handler to record `provider_task_id` after
    /// submit: the job stays `running`, picked back up only when the
    /// janitor's unstick pass re-queues it for the next poll.
    pub async fn update_payload(&self, job: &Job, payload: serde_json::Value) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("payload".to_string(), Value::StringValue(payload.to_string()));
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        self.client
            .update_document(
                &Self::jobs_collection(&job.batch_id),
                &job.id,
                fields,
                Some(vec!["payload".to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Mark a job terminally `failed` regardless of `attempts` — used
    /// for non-retryable provider errors (content policy, validation,
    /// auth) that must not consume the normal retry budget.
    pub async fn fail_terminal(&self, job: &Job, error: impl Into<String>) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), job_status_str(JobStatus::Failed).to_string().to_firestore_value());
        fields.insert("error".to_string(), error.into().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        self.client
            .update_document(
                &Self::jobs_collection(&job.batch_id),
                &job.id,
                fields,
                Some(vec!["status".to_string(), "error".to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Re-queue a job after a transient failure, or mark it terminally
    /// `failed` if `job.attempts` (already incremented by claim) has
    /// reached `MAX_ATTEMPTS`. Returns whether it is now terminal.
    pub async fn retry_or_fail(&self, job: &Job, error: impl Into<String>) -> StoreResult<bool> {
        let error = error.into();
        let terminal = job.attempts >= MAX_ATTEMPTS;
        let mut fields = HashMap::new();
        fields.insert(
            "status".to_string(),
            job_status_str(if terminal { JobStatus::Failed } else { JobStatus::Queued })
                .to_string()
                .to_firestore_value(),
        );
        fields.insert("error".to_string(), error.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        self.client
            .update_document(
                &Self::jobs_collection(&job.batch_id),
                &job.id,
                fields,
                Some(vec!["status".to_string(), "error".to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(terminal)
    }

    /// Jobs in `running` whose `updated_at` predates `threshold` — a
    /// video provider poll can legitimately run long, so the janitor's
    /// threshold must exceed any real handler's wall time.
    pub async fn list_stuck_running(&self, threshold: ChronoDuration) -> StoreResult<Vec<Job>> {
        let cutoff = Utc::now() - threshold;
        let docs = self.client.run_query(StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: JOBS_COLLECTION_ID.to_string(),
                all_descendants: true,
            }],
            r#where: Some(Filter::and(vec![
                Filter::eq("status", Value::StringValue("running".to_string())),
                Filter::lt("updated_at", cutoff.to_firestore_value()),
            ])),
            order_by: None,
            limit: Some(200),
        }).await?;
        Ok(docs.iter().filter_map(job_from_document).collect())
    }

    pub async fn list_by_batch_and_status(&self, batch_id: &str, status: JobStatus) -> StoreResult<Vec<Job>> {
        let docs = self.client.run_query(StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: JOBS_COLLECTION_ID.to_string(),
                all_descendants: true,
            }],
            r#where: Some(Filter::and(vec![
                Filter::eq("batch_id", Value::StringValue(batch_id.to_string())),
                Filter::eq("status", Value::StringValue(job_status_str(status).to_string())),
            ])),
            order_by: None,
            limit: Some(200),
        }).await?;
        Ok(docs.iter().filter_map(job_from_document).collect())
    }

    pub async fn list_open_by_batch(&self, batch_id: &str) -> StoreResult<Vec<Job>> {
        let mut out = self.list_by_batch_and_status(batch_id, JobStatus::Queued).await?;
        out.extend(self.list_by_batch_and_status(batch_id, JobStatus::Running).await?);
        Ok(out)
    }

    pub async fn delete(&self, job: &Job) -> StoreResult<()> {
        self.client.delete_document(&Self::jobs_collection(&job.batch_id), &job.id).await
    }

    /// Jobs in `done` older than `threshold`, deleted by the janitor to
    /// bound collection growth. `done` jobs carry no state anything
    /// else depends on.
    pub async fn list_old_done(&self, threshold: ChronoDuration) -> StoreResult<Vec<Job>> {
        let cutoff = Utc::now() - threshold;
        let docs = self.client.run_query(StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: JOBS_COLLECTION_ID.to_string(),
                all_descendants: true,
            }],
            r#where: Some(Filter::and(vec![
                Filter::eq("status", Value::StringValue("done".to_string())),
                Filter::lt("updated_at", cutoff.to_firestore_value()),
            ])),
            order_by: None,
            limit: Some(500),
        }).await?;
        Ok(docs.iter().filter_map(job_from_document).collect())
    }

    pub async fn list_terminal_failed(&self) -> StoreResult<Vec<Job>> {
        let docs = self.client.run_query(StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: JOBS_COLLECTION_ID.to_string(),
                all_descendants: true,
            }],
            r#where: Some(Filter::eq("status", Value::StringValue("failed".to_string()))),
            order_by: None,
            limit: Some(200),
        }).await?;
        Ok(docs.iter().filter_map(job_from_document).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips() {
        for t in [
            JobType::Compile,
            JobType::Tts,
            JobType::Video,
            JobType::Assemble,
            JobType::ImageCompile,
            JobType::Image,
            JobType::Research,
        ] {
            assert_eq!(job_type_from_str(t.as_str()), Some(t));
        }
    }

    #[test]
    fn job_status_round_trips() {
        for s in [JobStatus::Queued, JobStatus::Running, JobStatus::Done, JobStatus::Failed] {
            assert_eq!(job_status_from_str(job_status_str(s)), s);
        }
    }
}
