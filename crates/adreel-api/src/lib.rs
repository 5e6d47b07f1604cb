//! Axum HTTP API server: the batch/job control plane's external surface
//! (spec.md §6).
//!
//! This crate provides:
//! - Batch intake (`POST /generate-batch`)
//! - Worker dispatch (`POST /worker`), so the Scheduler can drive
//!   `Worker::run_once` over plain HTTP instead of embedding the
//!   worker loop in the same process
//! - Batch cancellation (`POST /cancel`)
//! - Rate limiting, security headers, and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
