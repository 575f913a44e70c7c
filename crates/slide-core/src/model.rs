//! Core slide data model.
//!
//! A `Slide` is a background image plus an ordered stack of `Layer`s; each
//! layer holds its own optional image and a list of `Overlay`s, rectangular
//! hotspots or toggles positioned in percentage units over the canvas.
//!
//! Layer level 0 is reserved for the slide's own background, which is always
//! rendered beneath the editable layers. The editable `layers` array is never
//! empty once a slide has been normalized, and its first entry is the
//! protected default layer.

use crate::config::EditorConfig;
use crate::geometry::PercentRect;
use crate::id::Uid;
use serde::{Deserialize, Serialize};

/// Geometry value used when a persisted overlay omits a field.
pub const DEFAULT_GEOMETRY: f64 = 45.0;

/// Level assigned to layers whose record omits one.
pub const DEFAULT_LAYER_LEVEL: i32 = 1;

// ─── Image ───────────────────────────────────────────────────────────────

/// A background or layer image, with its pixel size for aspect-correct
/// rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

// ─── Overlay ─────────────────────────────────────────────────────────────

/// What an overlay does when activated outside edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    #[default]
    Hotspot,
    Toggle,
}

/// A positioned rectangular region carrying link/action metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(default = "Uid::fresh")]
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Free-form style tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: OverlayKind,
    #[serde(default = "default_geometry")]
    pub top: f64,
    #[serde(default = "default_geometry")]
    pub left: f64,
    #[serde(default = "default_geometry")]
    pub width: f64,
    #[serde(default = "default_geometry")]
    pub height: f64,
    /// Link or action string followed outside edit mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_geometry() -> f64 {
    DEFAULT_GEOMETRY
}

impl Overlay {
    /// A new overlay with a fresh uid at the given position.
    pub fn new(rect: PercentRect, kind: OverlayKind) -> Self {
        Self {
            uid: Uid::fresh(),
            id: None,
            class: None,
            kind,
            top: rect.top,
            left: rect.left,
            width: rect.width,
            height: rect.height,
            target: None,
            label: None,
        }
    }

    pub fn rect(&self) -> PercentRect {
        PercentRect::new(self.left, self.top, self.width, self.height)
    }

    pub fn set_rect(&mut self, rect: PercentRect) {
        self.left = rect.left;
        self.top = rect.top;
        self.width = rect.width;
        self.height = rect.height;
    }

    /// Merge `patch` into this overlay. The uid is never touched.
    pub fn apply_patch(&mut self, patch: &OverlayPatch) {
        if let Some(id) = &patch.id {
            self.id = Some(id.clone());
        }
        if let Some(class) = &patch.class {
            self.class = Some(class.clone());
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(v) = patch.top {
            self.top = v;
        }
        if let Some(v) = patch.left {
            self.left = v;
        }
        if let Some(v) = patch.width {
            self.width = v;
        }
        if let Some(v) = patch.height {
            self.height = v;
        }
        if let Some(target) = &patch.target {
            self.target = Some(target.clone());
        }
        if let Some(label) = &patch.label {
            self.label = Some(label.clone());
        }
    }
}

/// Partial overlay update. Absent fields are left unchanged.
///
/// Unknown fields (including `uid`) are ignored on decode, so a full overlay
/// object is also a valid patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OverlayKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl OverlayPatch {
    /// A geometry-only patch, as produced on every drag/resize frame.
    pub fn geometry(rect: PercentRect) -> Self {
        Self {
            top: Some(rect.top),
            left: Some(rect.left),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Self::default()
        }
    }

    pub fn class(value: impl Into<String>) -> Self {
        Self {
            class: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn target(value: impl Into<String>) -> Self {
        Self {
            target: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn touches_geometry(&self) -> bool {
        self.top.is_some() || self.left.is_some() || self.width.is_some() || self.height.is_some()
    }

    /// All numeric fields that are present are finite.
    pub fn is_finite(&self) -> bool {
        [self.top, self.left, self.width, self.height]
            .into_iter()
            .flatten()
            .all(f64::is_finite)
    }
}

// ─── Layer ───────────────────────────────────────────────────────────────

/// A stackable visual plane holding its own optional image and overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default = "Uid::fresh")]
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Stacking order. 0 is the slide background.
    #[serde(default = "default_level")]
    pub level: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
    #[serde(default = "default_display")]
    pub display: bool,
}

fn default_level() -> i32 {
    DEFAULT_LAYER_LEVEL
}

fn default_display() -> bool {
    true
}

impl Layer {
    /// A new, empty, visible layer with a fresh uid.
    pub fn new(id: impl Into<String>, level: i32) -> Self {
        Self {
            uid: Uid::fresh(),
            id: Some(id.into()),
            level,
            image: None,
            overlays: Vec::new(),
            display: true,
        }
    }

    /// Label shown in layer pickers.
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or_else(|| self.uid.as_str())
    }

    /// Merge `patch` into this layer. The uid is never touched.
    pub fn apply_patch(&mut self, patch: &LayerPatch) {
        if let Some(id) = &patch.id {
            self.id = Some(id.clone());
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
        if let Some(image) = &patch.image {
            self.image = Some(image.clone());
        }
        if let Some(overlays) = &patch.overlays {
            self.overlays = overlays.clone();
        }
        if let Some(display) = patch.display {
            self.display = display;
        }
    }
}

/// Partial layer update, also used to override defaults in `add-layer`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlays: Option<Vec<Overlay>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,
}

impl LayerPatch {
    pub fn is_finite(&self) -> bool {
        self.overlays
            .iter()
            .flatten()
            .all(|ov| [ov.top, ov.left, ov.width, ov.height].iter().all(|v| v.is_finite()))
    }
}

// ─── Slide ───────────────────────────────────────────────────────────────

/// The top-level editable document: one record per persisted slide file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Position among slides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Background image, rendered at level 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl Slide {
    /// An empty slide with a fresh uid and no layers (not yet normalized).
    pub fn new() -> Self {
        Self {
            uid: Uid::fresh(),
            id: None,
            order: None,
            image: None,
            layers: Vec::new(),
            template: None,
        }
    }

    /// Establish the editing invariants on a freshly loaded slide.
    ///
    /// Inserts the default layer when there is none and constrains overlay
    /// geometry that falls outside the canvas. Returns the number of repairs
    /// made; a slide that already satisfies the invariants is left untouched.
    pub fn normalize(&mut self, config: &EditorConfig) -> usize {
        let mut repairs = 0;
        if self.layers.is_empty() {
            self.layers
                .push(Layer::new(config.default_layer_id.clone(), config.default_layer_level));
            repairs += 1;
        }
        for layer in &mut self.layers {
            for overlay in &mut layer.overlays {
                let rect = overlay.rect();
                let fixed = rect.constrained();
                if fixed != rect {
                    log::warn!(
                        "overlay {} out of bounds ({rect:?}), constrained to {fixed:?}",
                        overlay.uid
                    );
                    overlay.set_rect(fixed);
                    repairs += 1;
                }
            }
        }
        repairs
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn overlay(&self, at: OverlayRef) -> Option<&Overlay> {
        self.layers.get(at.layer_index)?.overlays.get(at.overlay_index)
    }

    /// Current position of the overlay with `uid`.
    pub fn locate(&self, uid: Uid) -> Option<OverlayRef> {
        self.layers.iter().enumerate().find_map(|(layer_index, layer)| {
            let overlay_index = layer.overlays.iter().position(|o| o.uid == uid)?;
            Some(OverlayRef::new(layer_index, overlay_index))
        })
    }

    /// Total overlay count across all layers.
    pub fn overlay_count(&self) -> usize {
        self.layers.iter().map(|l| l.overlays.len()).sum()
    }
}

impl Default for Slide {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Selection ───────────────────────────────────────────────────────────

/// Position of an overlay within a slide: `(layer index, overlay index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRef {
    pub layer_index: usize,
    pub overlay_index: usize,
}

impl OverlayRef {
    pub const fn new(layer_index: usize, overlay_index: usize) -> Self {
        Self {
            layer_index,
            overlay_index,
        }
    }
}

/// What is currently selected. Owned by the editor's store; other contexts
/// only ever hold a mirrored copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Layer(usize),
    Overlay(OverlayRef),
}

impl Selection {
    /// The selected layer, implied by an overlay selection too.
    pub fn layer_index(&self) -> Option<usize> {
        match self {
            Selection::None => None,
            Selection::Layer(layer) => Some(*layer),
            Selection::Overlay(at) => Some(at.layer_index),
        }
    }

    pub fn overlay(&self) -> Option<OverlayRef> {
        match self {
            Selection::Overlay(at) => Some(*at),
            _ => None,
        }
    }
}
