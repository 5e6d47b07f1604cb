//! Doorbell dispatch using Redis Streams.
//!
//! The stream never carries job state, only `JobDoorbell` wakeups. A
//! doorbell can be dropped, delivered twice, or delivered late without
//! affecting correctness: the Worker always re-validates against
//! Firestore before acting on one, and the Scheduler's fast tick falls
//! back to `adreel_store::JobRepository::claim_next_job` whenever the
//! stream has nothing pending.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::QueueJob;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub stream_name: String,
    pub consumer_group: String,
    pub dlq_stream_name: String,
    pub max_retries: u32,
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "adreel:doorbells".to_string(),
            consumer_group: "adreel:workers".to_string(),
            dlq_stream_name: "adreel:doorbells:dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM")
                .unwrap_or_else(|_| "adreel:doorbells".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "adreel:workers".to_string()),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM")
                .unwrap_or_else(|_| "adreel:doorbells:dlq".to_string()),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// Thin Redis Streams client carrying doorbell wakeups between the API
/// (or the Scheduler, on chained jobs) and the Worker's fast tick.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Ring a doorbell for a freshly enqueued or just-chained job. Safe
    /// to call even if the job was already claimed by the time a
    /// consumer wakes up on it — the Worker re-checks Firestore state.
    pub async fn ring(&self, job: QueueJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let idempotency_key = job.idempotency_key();
        let dedup_key = format!("adreel:dedup:{}", idempotency_key);

        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            debug!("doorbell already rung recently: {}", idempotency_key);
            return Err(QueueError::enqueue_failed("duplicate doorbell"));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await?;

        // Short TTL: this only suppresses a burst of redundant rings for
        // the same job, not cross-job dedup (Firestore owns that).
        conn.set_ex::<_, _, ()>(&dedup_key, "1", 30).await?;

        debug!(job_id = %job.job_id(), message_id = %message_id, "doorbell rung");
        Ok(message_id)
    }

    // ========================================================================
    // API-level idempotency (intake dedup)
    // ========================================================================

    /// Acquire a lock keyed on a client-supplied idempotency key (e.g. a
    /// request header on `generate-batch`). Returns `false` if a prior
    /// request already holds it.
    pub async fn try_acquire_idempotency(&self, key: &str, ttl_secs: u64) -> QueueResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let redis_key = format!("adreel:api_idempotency:{}", key);

        let result: bool = redis::cmd("SET")
            .arg(&redis_key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .unwrap_or(false);

        if result {
            debug!("acquired idempotency lock: {}", key);
        } else {
            warn!("duplicate request rejected: {}", key);
        }

        Ok(result)
    }

    pub async fn release_idempotency(&self, key: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let redis_key = format!("adreel:api_idempotency:{}", key);
        let _: () = redis::cmd("DEL").arg(&redis_key).query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Move an unparseable or permanently broken doorbell out of the way.
    pub async fn dlq(&self, message_id: &str, job: &QueueJob, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;
        warn!(job_id = %job.job_id(), "moved doorbell to DLQ: {}", error);
        Ok(())
    }

    /// Non-blocking drain: the fast tick calls this with a small count
    /// and a short block window so it never stalls the scheduling loop.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, QueueJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<QueueJob>(&payload_str) {
                        Ok(job) => jobs.push((message_id, job)),
                        Err(e) => {
                            warn!("failed to parse doorbell payload: {}", e);
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Reclaim doorbells left pending by a consumer that died mid-tick.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, QueueJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending_count: usize = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await
            .map(|reply: redis::streams::StreamPendingReply| reply.count())
            .unwrap_or(0);

        if pending_count == 0 {
            return Ok(Vec::new());
        }

        let pending_details: Vec<Vec<redis::Value>> = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut message_ids_to_claim = Vec::new();
        for detail in pending_details {
            if detail.len() >= 4 {
                if let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Int(idle_ms))) =
                    (detail.get(0), detail.get(2))
                {
                    let idle_ms = *idle_ms as u64;
                    if idle_ms >= min_idle_ms {
                        if let Ok(id) = String::from_utf8(id_bytes.clone()) {
                            message_ids_to_claim.push(id);
                        }
                    }
                }
            }
        }

        if message_ids_to_claim.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms);

        for msg_id in &message_ids_to_claim {
            cmd.arg(msg_id);
        }

        let claimed_messages: Vec<Vec<redis::Value>> = cmd.query_async(&mut conn).await?;

        let mut jobs = Vec::new();

        for message in claimed_messages {
            if message.len() >= 2 {
                if let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Array(fields))) =
                    (message.get(0), message.get(1))
                {
                    if let Ok(message_id) = String::from_utf8(id_bytes.clone()) {
                        let mut job_payload: Option<String> = None;
                        let mut i = 0;
                        while i < fields.len().saturating_sub(1) {
                            if let (
                                Some(redis::Value::BulkString(field_bytes)),
                                Some(redis::Value::BulkString(value_bytes)),
                            ) = (fields.get(i), fields.get(i + 1))
                            {
                                if let (Ok(field), Ok(value)) = (
                                    String::from_utf8(field_bytes.clone()),
                                    String::from_utf8(value_bytes.clone()),
                                ) {
                                    if field == "job" {
                                        job_payload = Some(value);
                                        break;
                                    }
                                }
                            }
                            i += 2;
                        }

                        if let Some(payload) = job_payload {
                            match serde_json::from_str::<QueueJob>(&payload) {
                                Ok(job) => {
                                    info!(job_id = %job.job_id(), "reclaimed stale doorbell");
                                    jobs.push((message_id, job));
                                }
                                Err(e) => {
                                    warn!("failed to parse reclaimed doorbell: {}", e);
                                    self.ack(&message_id).await.ok();
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(jobs)
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}
