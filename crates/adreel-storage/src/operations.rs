//! Deterministic blob keys for the pipeline's per-clip artifacts, plus
//! the upload/delete helpers each stage handler and the janitor use.
//!
//! Keys are a pure function of `clip_id` so a retried handler re-upload
//! is an idempotent overwrite rather than a new object — see spec.md §5
//! "storage blobs are written exactly once under deterministic keys."

use crate::client::R2Client;
use crate::error::StorageResult;

/// Build the `voice/{clip_id}.mp3` key.
pub fn voice_key(clip_id: &str) -> String {
    format!("voice/{clip_id}.mp3")
}

/// Build the `raw/{clip_id}.mp4` key (pre-watermark-removal / pre-assembly).
pub fn raw_video_key(clip_id: &str) -> String {
    format!("raw/{clip_id}.mp4")
}

/// Build the `final/{clip_id}.mp4` key (post-assembly, delivered asset).
pub fn final_video_key(clip_id: &str) -> String {
    format!("final/{clip_id}.mp4")
}

/// Build the `images/{clip_id}.png` key (image-output clips).
pub fn image_key(clip_id: &str) -> String {
    format!("images/{clip_id}.png")
}

/// Build the `previews/{clip_id}.jpg` key (optional thumbnail).
pub fn preview_key(clip_id: &str) -> String {
    format!("previews/{clip_id}.jpg")
}

/// All keys a clip may ever own, regardless of output type. Used by the
/// janitor's retention pass to delete best-effort on soft-delete.
pub fn all_keys_for_clip(clip_id: &str) -> Vec<String> {
    vec![
        voice_key(clip_id),
        raw_video_key(clip_id),
        final_video_key(clip_id),
        image_key(clip_id),
        preview_key(clip_id),
    ]
}

impl R2Client {
    pub async fn upload_voice(&self, clip_id: &str, audio: Vec<u8>, content_type: &str) -> StorageResult<String> {
        let key = voice_key(clip_id);
        self.upload_bytes(audio, &key, content_type).await?;
        Ok(key)
    }

    pub async fn upload_raw_video(&self, clip_id: &str, video: Vec<u8>) -> StorageResult<String> {
        let key = raw_video_key(clip_id);
        self.upload_bytes(video, &key, "video/mp4").await?;
        Ok(key)
    }

    pub async fn upload_final_video(&self, clip_id: &str, video: Vec<u8>) -> StorageResult<String> {
        let key = final_video_key(clip_id);
        self.upload_bytes(video, &key, "video/mp4").await?;
        Ok(key)
    }

    pub async fn upload_image(&self, clip_id: &str, image: Vec<u8>, content_type: &str) -> StorageResult<String> {
        let key = image_key(clip_id);
        self.upload_bytes(image, &key, content_type).await?;
        Ok(key)
    }

    /// Best-effort delete of every key a clip might own. Used by the
    /// janitor's retention pass and ancient-batch purge; individual
    /// object-not-found errors are not surfaced as failures since most
    /// clips only ever populate a subset of these keys.
    pub async fn delete_clip_blobs(&self, clip_id: &str) {
        let keys = all_keys_for_clip(clip_id);
        if let Err(e) = self.delete_objects(&keys).await {
            tracing::warn!(clip_id, error = %e, "best-effort clip blob delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_per_clip() {
        assert_eq!(voice_key("c1"), "voice/c1.mp3");
        assert_eq!(raw_video_key("c1"), "raw/c1.mp4");
        assert_eq!(final_video_key("c1"), "final/c1.mp4");
        assert_eq!(image_key("c1"), "images/c1.png");
        assert_eq!(voice_key("c1"), voice_key("c1"));
    }

    #[test]
    fn all_keys_for_clip_covers_every_asset_type() {
        let keys = all_keys_for_clip("c1");
        assert_eq!(keys.len(), 5);
        assert!(keys.contains(&"final/c1.mp4".to_string()));
    }
}
