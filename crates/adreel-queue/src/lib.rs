//! Doorbell dispatch over Redis Streams.
//!
//! Firestore (`adreel-store`) is the system of record for batch/clip/job
//! state; this crate only carries lightweight wakeups ("doorbells") so
//! the Worker's fast tick doesn't have to poll Firestore on every job
//! advance. Nothing here is authoritative, so losing or duplicating a
//! doorbell is harmless.

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::QueueJob;
pub use queue::{JobQueue, QueueConfig};
