//! Editor configuration.
//!
//! Every field has a default matching the stock editor, so an empty TOML
//! document (or no config at all) yields `EditorConfig::default()`.

use crate::geometry::PercentRect;
use crate::model::{DEFAULT_LAYER_LEVEL, OverlayKind};
use serde::{Deserialize, Serialize};

/// Geometry given to overlays created with `add-overlay`: a small box
/// centred on the canvas.
pub const NEW_OVERLAY_RECT: PercentRect = PercentRect::new(45.0, 47.5, 10.0, 5.0);

/// Configuration for the slide store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Rect given to newly added overlays. Default: `45, 47.5, 10 × 5`.
    pub new_overlay: PercentRect,

    /// Type given to newly added overlays. Default: **hotspot**.
    pub new_overlay_kind: OverlayKind,

    /// Label of the layer inserted into slides that have none.
    /// Default: `"default"`.
    pub default_layer_id: String,

    /// Level of that layer. Default: **1** (0 is the slide background).
    pub default_layer_level: i32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            new_overlay: NEW_OVERLAY_RECT,
            new_overlay_kind: OverlayKind::Hotspot,
            default_layer_id: "default".to_string(),
            default_layer_level: DEFAULT_LAYER_LEVEL,
        }
    }
}

impl EditorConfig {
    /// Parse a TOML config. Missing keys fall back to the defaults; the new
    /// overlay rect is constrained to the canvas.
    ///
    /// # Errors
    /// Returns the TOML error if the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: EditorConfig = toml::from_str(text)?;
        config.new_overlay = config.new_overlay.constrained();
        Ok(config)
    }
}
