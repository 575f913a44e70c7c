//! Bus protocol: the fixed set of event names and their payloads.
//!
//! Commands flow from the control panel (or any other client) to the canvas,
//! where the store interprets them. Notifications flow from the canvas
//! outward. On the wire every event is a JSON object
//! `{"event": "<name>", "detail": {...}}` with camelCase detail fields.
//!
//! | Direction | Events |
//! |-----------|--------|
//! | → canvas | `add-layer`, `remove-layer`, `update-layer`, `select-layer`, `add-overlay`, `remove-overlay`, `update-overlay`, `request-save`, `request-load`, `edit-mode` |
//! | canvas → | `slide-updated`, `layer-selected`, `overlay-selected`, `overlay-select`, `save-slide`, `load-slide` |
//! | bridge → | `save-completed`, `save-failed` |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slide_core::{LayerPatch, Overlay, OverlayPatch, OverlayRef, SaveOutcome, Slide};
use std::sync::Arc;
use thiserror::Error;

/// Names of all command events.
pub const COMMAND_NAMES: &[&str] = &[
    "add-layer",
    "remove-layer",
    "update-layer",
    "select-layer",
    "add-overlay",
    "remove-overlay",
    "update-overlay",
    "request-save",
    "request-load",
    "edit-mode",
];

/// Commands with no detail at all. Every other command accepts a missing
/// `detail` as an empty one.
const UNIT_COMMANDS: &[&str] = &["request-save", "request-load"];

/// Names of all notification events.
pub const NOTIFICATION_NAMES: &[&str] = &[
    "slide-updated",
    "layer-selected",
    "overlay-selected",
    "overlay-select",
    "save-slide",
    "load-slide",
    "save-completed",
    "save-failed",
];

/// A frame that could not be accepted at the bus boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed event frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("event frame has no `event` name")]
    MissingName,
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("`{0}` carries a non-finite number")]
    NonFinite(&'static str),
    #[error("the other side of the boundary is gone")]
    Disconnected,
}

// ─── Commands ────────────────────────────────────────────────────────────

/// A mutation or request addressed to the canvas store.
///
/// Missing indices default to the store's current selection when the canvas
/// interprets the command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "detail",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    AddLayer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layer: Option<LayerPatch>,
    },
    RemoveLayer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layer_index: Option<usize>,
    },
    UpdateLayer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layer_index: Option<usize>,
        updated_layer: LayerPatch,
    },
    SelectLayer {
        index: usize,
    },
    AddOverlay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layer_index: Option<usize>,
    },
    RemoveOverlay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layer_index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overlay_index: Option<usize>,
    },
    UpdateOverlay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layer_index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overlay_index: Option<usize>,
        updated_overlay: OverlayPatch,
    },
    RequestSave,
    RequestLoad,
    /// Toggles direct manipulation on the canvas.
    EditMode {
        enabled: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddLayer { .. } => "add-layer",
            Command::RemoveLayer { .. } => "remove-layer",
            Command::UpdateLayer { .. } => "update-layer",
            Command::SelectLayer { .. } => "select-layer",
            Command::AddOverlay { .. } => "add-overlay",
            Command::RemoveOverlay { .. } => "remove-overlay",
            Command::UpdateOverlay { .. } => "update-overlay",
            Command::RequestSave => "request-save",
            Command::RequestLoad => "request-load",
            Command::EditMode { .. } => "edit-mode",
        }
    }

    /// Reject payloads that decode but cannot be applied safely.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let finite = match self {
            Command::AddLayer { layer: Some(patch) } => patch.is_finite(),
            Command::UpdateLayer { updated_layer, .. } => updated_layer.is_finite(),
            Command::UpdateOverlay {
                updated_overlay, ..
            } => updated_overlay.is_finite(),
            _ => true,
        };
        if finite {
            Ok(())
        } else {
            Err(ProtocolError::NonFinite(self.name()))
        }
    }
}

// ─── Notifications ───────────────────────────────────────────────────────

/// State published by the canvas (and save results published by the bridge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "detail",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Notification {
    /// Full snapshot, sent after every store mutation.
    SlideUpdated {
        slide: Arc<Slide>,
        selected_layer_index: Option<usize>,
        selected_overlay_index: Option<OverlayRef>,
    },
    /// Selection narrowcast: a layer with no overlay is selected.
    LayerSelected { layer_index: usize },
    /// Selection narrowcast: an overlay is selected.
    OverlaySelected {
        layer_index: usize,
        overlay_index: usize,
    },
    /// Manual pick of an overlay in edit mode; the detail is the overlay.
    OverlaySelect(Overlay),
    SaveSlide { slide: Arc<Slide> },
    LoadSlide { slide: Arc<Slide> },
    SaveCompleted { target: String, bytes: usize },
    SaveFailed { target: String, reason: String },
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::SlideUpdated { .. } => "slide-updated",
            Notification::LayerSelected { .. } => "layer-selected",
            Notification::OverlaySelected { .. } => "overlay-selected",
            Notification::OverlaySelect(_) => "overlay-select",
            Notification::SaveSlide { .. } => "save-slide",
            Notification::LoadSlide { .. } => "load-slide",
            Notification::SaveCompleted { .. } => "save-completed",
            Notification::SaveFailed { .. } => "save-failed",
        }
    }
}

impl From<SaveOutcome> for Notification {
    fn from(outcome: SaveOutcome) -> Self {
        match outcome {
            SaveOutcome::Saved { target, bytes } => Notification::SaveCompleted { target, bytes },
            SaveOutcome::Failed { target, reason } => Notification::SaveFailed { target, reason },
        }
    }
}

// ─── Events ──────────────────────────────────────────────────────────────

/// Anything that travels on the bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Command(Command),
    Notification(Notification),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Command(c) => c.name(),
            Event::Notification(n) => n.name(),
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Event::Command(c) => c.validate(),
            Event::Notification(_) => Ok(()),
        }
    }

    /// Serialize to a wire frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a wire frame. The `event` name selects which
    /// payload schema the detail is checked against.
    ///
    /// A command whose fields are all optional may omit `detail`; the
    /// missing fields then default to the canvas selection.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut value: Value = serde_json::from_str(frame)?;
        let name = value
            .get("event")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingName)?
            .to_string();
        let name = name.as_str();

        let event = if COMMAND_NAMES.contains(&name) {
            if !UNIT_COMMANDS.contains(&name) {
                if let Some(object) = value.as_object_mut() {
                    object
                        .entry("detail")
                        .or_insert_with(|| Value::Object(Default::default()));
                }
            }
            Event::Command(serde_json::from_value(value)?)
        } else if NOTIFICATION_NAMES.contains(&name) {
            Event::Notification(serde_json::from_value(value)?)
        } else {
            return Err(ProtocolError::UnknownEvent(name.to_string()));
        };
        event.validate()?;
        Ok(event)
    }
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        Event::Command(command)
    }
}

impl From<Notification> for Event {
    fn from(notification: Notification) -> Self {
        Event::Notification(notification)
    }
}
