//! Persisted slide records: one JSON file per slide.
//!
//! Decoding applies the record defaults (missing geometry → 45, missing
//! layer level → 1, missing layer/overlay uids → fresh) and then normalizes
//! the slide so it is ready for editing. Encoding is the exact inverse for
//! normalized slides: `decode(encode(s)) == s`.

use crate::config::EditorConfig;
use crate::model::Slide;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to read or write a slide record.
#[derive(Debug, Error)]
pub enum SlideError {
    #[error("invalid slide record: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode slide {uid}: {source}")]
    Encode {
        uid: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a slide record and normalize it with `config`.
///
/// # Errors
/// Returns [`SlideError::Decode`] if the JSON is malformed, the slide `uid` is
/// missing, or an overlay `type` is not `hotspot`/`toggle`.
pub fn decode_slide(json: &str, config: &EditorConfig) -> Result<Slide, SlideError> {
    let mut slide: Slide = serde_json::from_str(json).map_err(SlideError::Decode)?;
    let repairs = slide.normalize(config);
    if repairs > 0 {
        log::debug!("normalized slide {} ({repairs} repairs)", slide.uid);
    }
    Ok(slide)
}

/// Serialize a slide record as pretty-printed JSON (the on-disk form).
///
/// # Errors
/// Returns [`SlideError::Encode`] if a value cannot be represented in JSON.
pub fn encode_slide(slide: &Slide) -> Result<String, SlideError> {
    serde_json::to_string_pretty(slide).map_err(|source| SlideError::Encode {
        uid: slide.uid.to_string(),
        source,
    })
}

// ─── Save requests ───────────────────────────────────────────────────────

/// A finalized slide and the storage identifier it should be written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Storage path of the slide record, relative to the content root.
    pub target: String,
    pub slide: Slide,
}

/// Result of one committed (or failed) save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SaveOutcome {
    Saved { target: String, bytes: usize },
    Failed { target: String, reason: String },
}

impl SaveOutcome {
    pub fn target(&self) -> &str {
        match self {
            SaveOutcome::Saved { target, .. } | SaveOutcome::Failed { target, .. } => target,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Uid;
    use crate::model::OverlayKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_applies_record_defaults() {
        let json = r#"{
  "uid": "slide-0",
  "order": 0,
  "image": { "src": "../slides/Slide0.png", "width": 1365, "height": 1024 },
  "layers": [ { "overlays": [ { "target": "/next" } ] } ]
}"#;
        let slide = decode_slide(json, &EditorConfig::default()).unwrap();
        assert_eq!(slide.uid, Uid::intern("slide-0"));
        let layer = &slide.layers[0];
        assert_eq!(layer.level, 1);
        assert!(layer.display);
        let overlay = &layer.overlays[0];
        assert_eq!(overlay.kind, OverlayKind::Hotspot);
        assert_eq!(
            (overlay.left, overlay.top, overlay.width, overlay.height),
            (45.0, 45.0, 45.0, 45.0)
        );
        assert_eq!(overlay.target.as_deref(), Some("/next"));
    }

    #[test]
    fn decode_inserts_default_layer() {
        let slide = decode_slide(r#"{ "uid": "bare" }"#, &EditorConfig::default()).unwrap();
        assert_eq!(slide.layers.len(), 1);
        assert_eq!(slide.layers[0].id.as_deref(), Some("default"));
        assert_eq!(slide.layers[0].level, 1);
    }

    #[test]
    fn decode_rejects_missing_uid() {
        assert!(matches!(
            decode_slide(r#"{ "layers": [] }"#, &EditorConfig::default()),
            Err(SlideError::Decode(_))
        ));
    }

    #[test]
    fn decode_rejects_unknown_overlay_type() {
        let json = r#"{ "uid": "s", "layers": [ { "overlays": [ { "type": "popup" } ] } ] }"#;
        assert!(decode_slide(json, &EditorConfig::default()).is_err());
    }

    #[test]
    fn missing_uids_are_assigned_once() {
        let json = r#"{ "uid": "s", "layers": [ { "overlays": [ {} ] } ] }"#;
        let slide = decode_slide(json, &EditorConfig::default()).unwrap();
        let encoded = encode_slide(&slide).unwrap();
        let reloaded = decode_slide(&encoded, &EditorConfig::default()).unwrap();
        assert_eq!(reloaded, slide);
    }

    #[test]
    fn save_outcome_shape() {
        let outcome = SaveOutcome::Failed {
            target: "src/content/slide/Slide1.json".into(),
            reason: "disk full".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(
            json,
            r#"{"status":"failed","target":"src/content/slide/Slide1.json","reason":"disk full"}"#
        );
        assert!(!outcome.is_saved());
    }
}
