//! Clip repository: per-clip reads and the guarded forward-only
//! transition that every stage handler uses to progress a clip.

use std::collections::HashMap;

use adreel_models::batch::{OutputType, VideoService};
use adreel_models::clip::{Clip, ClipStatus, OnScreenText};
use chrono::{DateTime, Utc};

use crate::client::StoreClient;
use crate::error::StoreResult;
use crate::types::{
    CollectionSelector, Document, FieldReference, Filter, FromFirestoreValue, Order,
    StructuredQuery, ToFirestoreValue, Value,
};

const CLIPS_COLLECTION_ID: &str = "clips";

fn clips_collection(batch_id: &str) -> String {
    format!("batches/{}/clips", batch_id)
}

pub(crate) fn clip_to_fields(c: &Clip) -> HashMap<String, Value> {
    let mut f = HashMap::new();
    f.insert("batch_id".into(), c.batch_id.clone().to_firestore_value());
    f.insert("variant_id".into(), c.variant_id.clone().to_firestore_value());
    f.insert("preset_key".into(), c.preset_key.clone().to_firestore_value());
    f.insert("status".into(), clip_status_str(c.status).to_string().to_firestore_value());
    f.insert("script_spoken".into(), c.script_spoken.clone().to_firestore_value());
    f.insert(
        "on_screen_text".into(),
        c.on_screen_text
            .iter()
            .map(|o| {
                let mut m = HashMap::new();
                m.insert("t_seconds".to_string(), o.t_seconds.to_firestore_value());
                m.insert("text".to_string(), o.text.clone().to_firestore_value());
                m.to_firestore_value()
            })
            .collect::<Vec<Value>>()
            .to_firestore_value(),
    );
    f.insert("sora_prompt".into(), c.sora_prompt.clone().to_firestore_value());
    f.insert("voice_url".into(), c.voice_url.clone().to_firestore_value());
    f.insert("raw_video_url".into(), c.raw_video_url.clone().to_firestore_value());
    f.insert("final_url".into(), c.final_url.clone().to_firestore_value());
    f.insert("image_url".into(), c.image_url.clone().to_firestore_value());
    f.insert("image_prompt".into(), c.image_prompt.clone().to_firestore_value());
    f.insert("winner".into(), c.winner.to_firestore_value());
    f.insert("killed".into(), c.killed.to_firestore_value());
    f.insert("provider".into(), c.provider.clone().to_firestore_value());
    f.insert(
        "video_service".into(),
        c.video_service
            .map(|s| match s {
                VideoService::Sora => "sora",
                VideoService::Kling => "kling",
            })
            .to_firestore_value(),
    );
    f.insert("error".into(), c.error.clone().to_firestore_value());
    f.insert("created_at".into(), c.created_at.to_firestore_value());
    f.insert("updated_at".into(), c.updated_at.to_firestore_value());
    f.insert("deleted_at".into(), c.deleted_at.to_firestore_value());
    f
}

fn clip_status_str(s: ClipStatus) -> &'static str {
    match s {
        ClipStatus::Planned => "planned",
        ClipStatus::Scripting => "scripting",
        ClipStatus::Vo => "vo",
        ClipStatus::Rendering => "rendering",
        ClipStatus::Assembling => "assembling",
        ClipStatus::Generating => "generating",
        ClipStatus::Ready => "ready",
        ClipStatus::Failed => "failed",
    }
}

fn clip_status_from_str(s: &str) -> ClipStatus {
    match s {
        "scripting" => ClipStatus::Scripting,
        "vo" => ClipStatus::Vo,
        "rendering" => ClipStatus::Rendering,
        "assembling" => ClipStatus::Assembling,
        "generating" => ClipStatus::Generating,
        "ready" => ClipStatus::Ready,
        "failed" => ClipStatus::Failed,
        _ => ClipStatus::Planned,
    }
}

fn clip_from_document(id: &str, batch_id: &str, doc: &Document) -> Option<Clip> {
    let fields = doc.fields.as_ref()?;
    let get_str = |k: &str| fields.get(k).and_then(String::from_firestore_value);
    let on_screen_text = fields
        .get("on_screen_text")
        .and_then(|v| match v {
            Value::ArrayValue(a) => a.values.clone(),
            _ => None,
        })
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            Value::MapValue(m) => {
                let fields = m.fields?;
                Some(OnScreenText {
                    t_seconds: fields.get("t_seconds").and_then(f64::from_firestore_value).unwrap_or(0.0),
                    text: fields.get("text").and_then(String::from_firestore_value).unwrap_or_default(),
                })
            }
            _ => None,
        })
        .collect();

    Some(Clip {
        id: id.to_string(),
        batch_id: batch_id.to_string(),
        variant_id: get_str("variant_id").unwrap_or_default(),
        preset_key: get_str("preset_key").unwrap_or_default(),
        status: clip_status_from_str(&get_str("status").unwrap_or_default()),
        script_spoken: get_str("script_spoken"),
        on_screen_text,
        sora_prompt: get_str("sora_prompt"),
        voice_url: get_str("voice_url"),
        raw_video_url: get_str("raw_video_url"),
        final_url: get_str("final_url"),
        image_url: get_str("image_url"),
        image_prompt: get_str("image_prompt"),
        winner: fields.get("winner").and_then(bool::from_firestore_value).unwrap_or(false),
        killed: fields.get("killed").and_then(bool::from_firestore_value).unwrap_or(false),
        provider: get_str("provider"),
        video_service: get_str("video_service").and_then(|s| match s.as_str() {
            "sora" => Some(VideoService::Sora),
            "kling" => Some(VideoService::Kling),
            _ => None,
        }),
        error: get_str("error"),
        created_at: fields
            .get("created_at")
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now),
        updated_at: fields
            .get("updated_at")
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now),
        deleted_at: fields.get("deleted_at").and_then(DateTime::<Utc>::from_firestore_value),
    })
}

/// Like `clip_from_document`, but for collection-group query results
/// where neither the clip id nor its parent batch id are known ahead of
/// time: both are recovered from the document name / `batch_id` field.
fn clip_from_cg_document(doc: &Document) -> Option<Clip> {
    let name = doc.name.as_deref()?;
    let id = name.rsplit('/').next()?.to_string();
    let fields = doc.fields.as_ref()?;
    let batch_id = fields.get("batch_id").and_then(String::from_firestore_value)?;
    clip_from_document(&id, &batch_id, doc)
}

/// A field patch applied alongside a status transition. Handlers build
/// this from the artifact they just produced (e.g. `voice_url`).
#[derive(Debug, Clone, Default)]
pub struct ClipPatch {
    pub script_spoken: Option<String>,
    pub on_screen_text: Option<Vec<OnScreenText>>,
    pub sora_prompt: Option<String>,
    pub voice_url: Option<String>,
    pub raw_video_url: Option<String>,
    pub final_url: Option<String>,
    pub image_url: Option<String>,
    pub image_prompt: Option<String>,
    pub provider: Option<String>,
    pub error: Option<String>,
    pub winner: Option<bool>,
    pub killed: Option<bool>,
}

pub struct ClipRepository {
    client: StoreClient,
}

impl ClipRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, batch_id: &str, clip_id: &str) -> StoreResult<Option<Clip>> {
        let doc = self.client.get_document(&clips_collection(batch_id), clip_id).await?;
        Ok(doc.and_then(|d| clip_from_document(clip_id, batch_id, &d)))
    }

    pub async fn list_by_batch(&self, batch_id: &str) -> StoreResult<Vec<Clip>> {
        let resp = self
            .client
            .list_documents(&clips_collection(batch_id), Some(64), None)
            .await?;
        Ok(resp
            .documents
            .unwrap_or_default()
            .iter()
            .filter_map(|doc| {
                let id = doc.name.as_deref()?.rsplit('/').next()?.to_string();
                clip_from_document(&id, batch_id, doc)
            })
            .collect())
    }

    /// Guarded single-row update: refuses to write (returns `Ok(false)`)
    /// if the clip's current status is not exactly `expected_current`,
    /// or if `expected_current.can_advance_to(next)` is false. Handlers
    /// re-entering after a crash call this with the same `next` they
    /// last attempted; if the clip already advanced past it (another
    /// worker finished the retry first) this is a harmless no-op.
    pub async fn advance_clip(
        &self,
        batch_id: &str,
        clip_id: &str,
        expected_current: ClipStatus,
        next: ClipStatus,
        patch: ClipPatch,
    ) -> StoreResult<bool> {
        if !expected_current.can_advance_to(next) {
            return Ok(false);
        }

        let doc = self
            .client
            .get_document(&clips_collection(batch_id), clip_id)
            .await?;
        let Some(doc) = doc else { return Ok(false) };
        let Some(current) = clip_from_document(clip_id, batch_id, &doc) else {
            return Ok(false);
        };
        if current.status != expected_current {
            return Ok(false);
        }

        let mut fields = HashMap::new();
        let mut mask = vec!["status".to_string(), "updated_at".to_string()];
        fields.insert("status".to_string(), clip_status_str(next).to_string().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        macro_rules! apply {
            ($field:ident, $name:literal) => {
                if let Some(v) = patch.$field {
                    fields.insert($name.to_string(), v.to_firestore_value());
                    mask.push($name.to_string());
                }
            };
        }
        apply!(script_spoken, "script_spoken");
        apply!(sora_prompt, "sora_prompt");
        apply!(voice_url, "voice_url");
        apply!(raw_video_url, "raw_video_url");
        apply!(final_url, "final_url");
        apply!(image_url, "image_url");
        apply!(image_prompt, "image_prompt");
        apply!(provider, "provider");
        apply!(error, "error");
        apply!(winner, "winner");
        apply!(killed, "killed");
        if let Some(ost) = patch.on_screen_text {
            let value = ost
                .iter()
                .map(|o| {
                    let mut m = HashMap::new();
                    m.insert("t_seconds".to_string(), o.t_seconds.to_firestore_value());
                    m.insert("text".to_string(), o.text.clone().to_firestore_value());
                    m.to_firestore_value()
                })
                .collect::<Vec<Value>>()
                .to_firestore_value();
            fields.insert("on_screen_text".to_string(), value);
            mask.push("on_screen_text".to_string());
        }

        match self
            .client
            .update_document_with_precondition(
                &clips_collection(batch_id),
                clip_id,
                fields,
                Some(mask),
                doc.update_time.as_deref(),
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_precondition_failed() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Force-fail a clip regardless of current status, unless it is
    /// already terminal. Used by the janitor and by cancellation.
    pub async fn fail(&self, batch_id: &str, clip_id: &str, error: impl Into<String>) -> StoreResult<bool> {
        let doc = self
            .client
            .get_document(&clips_collection(batch_id), clip_id)
            .await?;
        let Some(doc) = doc else { return Ok(false) };
        let Some(current) = clip_from_document(clip_id, batch_id, &doc) else {
            return Ok(false);
        };
        if current.status.is_terminal() {
            return Ok(false);
        }

        let mut fields = HashMap::new();
        fields.insert("status".to_string(), clip_status_str(ClipStatus::Failed).to_string().to_firestore_value());
        fields.insert("error".to_string(), error.into().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        let mask = vec!["status".to_string(), "error".to_string(), "updated_at".to_string()];

        match self
            .client
            .update_document_with_precondition(
                &clips_collection(batch_id),
                clip_id,
                fields,
                Some(mask),
                doc.update_time.as_deref(),
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_precondition_failed() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Soft-delete: sets `deleted_at` so retention/killed clips stop
    /// appearing in listings while the document (and its storage blobs,
    /// removed separately) still exist for a grace period.
    pub async fn soft_delete(&self, batch_id: &str, clip_id: &str) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("deleted_at".to_string(), Utc::now().to_firestore_value());
        self.client
            .update_document(
                &clips_collection(batch_id),
                clip_id,
                fields,
                Some(vec!["deleted_at".to_string()]),
            )
            .await?;
        Ok(())
    }

    pub fn is_ready_for_output(clip: &Clip, output_type: OutputType) -> bool {
        clip.status == ClipStatus::Ready && clip.has_required_ready_urls(output_type)
    }

    /// Clips the janitor's retention pass should soft-delete: every
    /// `killed` clip, plus every non-winner clip older than
    /// `non_winner_max_age`. Two collection-group queries (Firestore's
    /// REST surface has no server-side OR) merged and de-duplicated;
    /// already soft-deleted clips are filtered out client-side since
    /// `deleted_at != null` has no cheap inequality-on-absent-field form.
    pub async fn list_retention_candidates(&self, non_winner_max_age: chrono::Duration) -> StoreResult<Vec<Clip>> {
        let killed = self
            .client
            .run_query(StructuredQuery {
                from: vec![CollectionSelector { collection_id: CLIPS_COLLECTION_ID.to_string(), all_descendants: true }],
                r#where: Some(Filter::eq("killed", true.to_firestore_value())),
                order_by: None,
                limit: Some(200),
            })
            .await?;

        let cutoff = Utc::now() - non_winner_max_age;
        let stale = self
            .client
            .run_query(StructuredQuery {
                from: vec![CollectionSelector { collection_id: CLIPS_COLLECTION_ID.to_string(), all_descendants: true }],
                r#where: Some(Filter::and(vec![
                    Filter::eq("winner", false.to_firestore_value()),
                    Filter::lt("updated_at", cutoff.to_firestore_value()),
                ])),
                order_by: Some(vec![Order {
                    field: FieldReference { field_path: "updated_at".to_string() },
                    direction: "ASCENDING".to_string(),
                }]),
                limit: Some(200),
            })
            .await?;

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for doc in killed.iter().chain(stale.iter()) {
            let Some(clip) = clip_from_cg_document(doc) else { continue };
            if clip.deleted_at.is_some() {
                continue;
            }
            if seen.insert(clip.id.clone()) {
                out.push(clip);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            ClipStatus::Planned,
            ClipStatus::Scripting,
            ClipStatus::Vo,
            ClipStatus::Rendering,
            ClipStatus::Assembling,
            ClipStatus::Generating,
            ClipStatus::Ready,
            ClipStatus::Failed,
        ] {
            assert_eq!(clip_status_from_str(clip_status_str(s)), s);
        }
    }
}
