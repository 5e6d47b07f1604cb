//! Firestore-backed Store: the durable batch/clip/job/credit control
//! plane described by the batch control plane. Built on a thin
//! Firestore REST API client rather than a native Firestore SDK so the
//! Worker and Scheduler binaries stay lightweight.
//!
//! Production-grade client with:
//! - Token caching via `gcp_auth`
//! - Exponential backoff with jitter on transient errors
//! - Observability (tracing spans, Prometheus metrics)
//!
//! ## Modules
//! - `client` - thin Firestore REST API client (get/update/query/batchWrite)
//! - `types` - Firestore document/value conversions
//! - `batch_repo` - Batch lifecycle: intake's atomic write, transitions, refund
//! - `clip_repo` - Per-clip guarded stage transitions
//! - `job_repo` - Job claim/enqueue/finish and the janitor's queries
//! - `user_credits` - Per-user prepaid balance (debit/credit)
//! - `service_log_repo` - Append-only, best-effort telemetry
//! - `retry` - Retry policy with exponential backoff
//! - `metrics` - Prometheus metrics collection

pub mod batch_repo;
pub mod clip_repo;
pub mod client;
pub mod error;
pub mod job_repo;
pub mod metrics;
pub mod retry;
pub mod service_log_repo;
pub mod types;
pub mod user_credits;

pub use batch_repo::BatchRepository;
pub use clip_repo::{ClipPatch, ClipRepository};
pub use client::{StoreClient, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use job_repo::JobRepository;
pub use retry::RetryConfig;
pub use service_log_repo::ServiceLogRepository;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
pub use user_credits::UserCreditsRepository;

/// Bundles the three repositories the Worker and API touch in every
/// request, each sharing one underlying HTTP client/token cache.
#[derive(Clone)]
pub struct Store {
    pub batches: std::sync::Arc<BatchRepository>,
    pub clips: std::sync::Arc<ClipRepository>,
    pub jobs: std::sync::Arc<JobRepository>,
    pub service_log: std::sync::Arc<ServiceLogRepository>,
    client: StoreClient,
}

impl Store {
    pub fn new(client: StoreClient) -> Self {
        Self {
            batches: std::sync::Arc::new(BatchRepository::new(client.clone())),
            clips: std::sync::Arc::new(ClipRepository::new(client.clone())),
            jobs: std::sync::Arc::new(JobRepository::new(client.clone())),
            service_log: std::sync::Arc::new(ServiceLogRepository::new(client.clone())),
            client,
        }
    }

    pub async fn from_env() -> StoreResult<Self> {
        let client = StoreClient::from_env().await?;
        Ok(Self::new(client))
    }

    pub fn user_credits(&self, user_id: impl Into<String>) -> UserCreditsRepository {
        UserCreditsRepository::new(self.client.clone(), user_id)
    }
}
