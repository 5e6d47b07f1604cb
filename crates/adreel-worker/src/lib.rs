#![deny(unreachable_patterns)]
//! Batch/clip job dispatch worker.
//!
//! This crate provides:
//! - `Worker::run_once`, the single-job-per-invocation dispatch loop
//! - One stage handler per job type (compile, tts, video, assemble,
//!   image_compile, image, research)
//! - The Scheduler's fast-tick and janitor passes, as spawnable loops
//! - Two-phase batch cancellation
//! - Service-log emission and the retry/permanent-failure error split

pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod janitor;
pub mod scheduler;
pub mod service_log;
pub mod stages;

pub use cancel::cancel_batch;
pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::{RunOnceResult, Worker};
pub use janitor::{run_janitor_pass, JanitorReport};
pub use scheduler::{run_fast_tick, spawn_fast_tick_loop, spawn_janitor_loop, Scheduler};
