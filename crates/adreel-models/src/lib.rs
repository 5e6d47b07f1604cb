//! Shared domain models for the batch/job control plane:
//! - Batch and Clip: the user-facing entities and their status machines
//! - Job: the Worker's unit of dispatch
//! - Credit ledger: per-user balance and its transaction log
//! - Provider DTOs: request/response shapes crossing into `adreel-providers`
//! - Timing budget: script word caps and overlay constraints

pub mod batch;
pub mod clip;
pub mod credit;
pub mod job;
pub mod provider;
pub mod service_log;
pub mod timing;

pub use batch::{Batch, BatchMode, BatchStatus, OutputType, QualityMode, VideoService};
pub use clip::{Clip, ClipStatus, OnScreenText};
pub use credit::{CreditOperation, CreditTransaction, UserCredits};
pub use job::{Job, JobDoorbell, JobStatus, JobType, MAX_ATTEMPTS};
pub use service_log::{ServiceLogEntry, ServiceLogOutcome};
