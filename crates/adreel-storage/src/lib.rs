//! Cloudflare R2 object storage client.
//!
//! This crate provides:
//! - File/byte upload/download to R2
//! - Presigned URL generation
//! - Deterministic per-clip blob keys (`voice/`, `raw/`, `final/`, `images/`, `previews/`)
//! - Secure clip delivery (playback/download/share URLs)

pub mod client;
pub mod delivery;
pub mod error;
pub mod operations;

pub use client::R2Client;
pub use delivery::{DeliveryConfig, DeliveryScope, DeliveryToken, DeliveryUrl, DeliveryUrlGenerator};
pub use error::{StorageError, StorageResult};
pub use operations::{all_keys_for_clip, final_video_key, image_key, preview_key, raw_video_key, voice_key};
