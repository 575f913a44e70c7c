//! Control panel: the other side of the boundary.
//!
//! The panel never owns the slide. It keeps a [`PanelMirror`] of the last
//! state the canvas published and turns user actions into commands.
//!
//! The overlay property form is rebuilt only when the selection narrowcast
//! says the selected overlay changed. `slide-updated` refreshes the mirror
//! and the layer picker but leaves the form alone, so a field being typed
//! into keeps its value and focus while its own edits echo back. The one
//! exception is a broadcast in which the form's position now holds a
//! different overlay (an earlier sibling was removed): the form is rebuilt so
//! edits never land on an overlay the user is not looking at.

use crate::boundary::BoundaryPort;
use crate::protocol::{Command, Event, Notification, ProtocolError};
use slide_core::{Overlay, OverlayPatch, OverlayRef, SaveOutcome, SaveRequest, Slide, Uid};
use std::sync::Arc;

/// Where `save-slide` requests go. Implemented by the persistence bridge.
pub trait SaveSink {
    fn submit(&self, request: SaveRequest);
}

impl<F: Fn(SaveRequest)> SaveSink for F {
    fn submit(&self, request: SaveRequest) {
        self(request)
    }
}

// ─── Mirror ──────────────────────────────────────────────────────────────

/// Last state received from the canvas. Updated only through [`apply`](Self::apply).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelMirror {
    pub slide: Option<Arc<Slide>>,
    pub current_layer: Option<usize>,
    pub current_overlay: Option<OverlayRef>,
}

impl PanelMirror {
    pub fn apply(&mut self, notification: &Notification) {
        match notification {
            Notification::SlideUpdated {
                slide,
                selected_layer_index,
                selected_overlay_index,
            } => {
                self.slide = Some(Arc::clone(slide));
                self.current_layer = *selected_layer_index;
                self.current_overlay = *selected_overlay_index;
            }
            Notification::LayerSelected { layer_index } => {
                self.current_layer = Some(*layer_index);
                self.current_overlay = None;
            }
            Notification::OverlaySelected {
                layer_index,
                overlay_index,
            } => {
                self.current_layer = Some(*layer_index);
                self.current_overlay = Some(OverlayRef::new(*layer_index, *overlay_index));
            }
            Notification::LoadSlide { slide } => {
                self.slide = Some(Arc::clone(slide));
            }
            _ => {}
        }
    }

    pub fn overlay(&self, at: OverlayRef) -> Option<&Overlay> {
        self.slide.as_deref()?.overlay(at)
    }
}

// ─── View ────────────────────────────────────────────────────────────────

/// One entry of the layer picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOption {
    pub index: usize,
    pub label: String,
}

/// Property form for the selected overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayForm {
    pub at: OverlayRef,
    /// The overlay the form was built from.
    pub uid: Uid,
    pub class: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelView {
    pub layers: Vec<LayerOption>,
    pub selected_layer: Option<usize>,
    pub form: Option<OverlayForm>,
    /// Bumped every time the form is rebuilt from the mirror.
    pub form_generation: u64,
    pub edit_mode: bool,
    pub last_save: Option<SaveOutcome>,
}

fn layer_options(slide: Option<&Slide>) -> Vec<LayerOption> {
    match slide {
        Some(slide) if !slide.layers.is_empty() => slide
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| LayerOption {
                index,
                label: layer.label().to_string(),
            })
            .collect(),
        _ => vec![LayerOption {
            index: 0,
            label: "Default".to_string(),
        }],
    }
}

// ─── Panel ───────────────────────────────────────────────────────────────

pub struct ControlPanel<S: SaveSink> {
    port: BoundaryPort,
    sink: S,
    /// Storage path of the slide being edited.
    target: String,
    mirror: PanelMirror,
    view: PanelView,
    /// Overlay the last narrowcast selected but the mirror did not contain yet.
    pending_form: Option<OverlayRef>,
}

impl<S: SaveSink> ControlPanel<S> {
    pub fn new(port: BoundaryPort, sink: S, target: impl Into<String>) -> Self {
        Self {
            port,
            sink,
            target: target.into(),
            mirror: PanelMirror::default(),
            view: PanelView {
                layers: layer_options(None),
                ..PanelView::default()
            },
            pending_form: None,
        }
    }

    /// Ask the canvas for the current slide.
    pub fn start(&self) -> Result<(), ProtocolError> {
        self.send(Command::RequestLoad)
    }

    pub fn mirror(&self) -> &PanelMirror {
        &self.mirror
    }

    pub fn view(&self) -> &PanelView {
        &self.view
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Apply every event waiting on the port. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let events = self.port.drain();
        let count = events.len();
        for event in events {
            match event {
                Event::Notification(notification) => self.apply(notification),
                Event::Command(command) => {
                    log::warn!("panel: ignoring inbound command {}", command.name());
                }
            }
        }
        count
    }

    pub fn apply(&mut self, notification: Notification) {
        self.mirror.apply(&notification);
        match notification {
            Notification::SlideUpdated { .. } => {
                self.refresh_layers();
                if let Some(at) = self.pending_form {
                    self.build_form(at);
                } else if self.form_is_stale() {
                    match self.mirror.current_overlay {
                        Some(at) => self.build_form(at),
                        None => self.clear_form(),
                    }
                }
            }
            Notification::LayerSelected { .. } => {
                self.refresh_layers();
                self.clear_form();
            }
            Notification::OverlaySelected {
                layer_index,
                overlay_index,
            } => {
                self.refresh_layers();
                self.build_form(OverlayRef::new(layer_index, overlay_index));
            }
            Notification::LoadSlide { .. } => {
                self.refresh_layers();
                self.clear_form();
            }
            Notification::SaveSlide { slide } => {
                log::debug!("panel: submitting save for {}", self.target);
                self.sink.submit(SaveRequest {
                    target: self.target.clone(),
                    slide: Slide::clone(&slide),
                });
            }
            Notification::SaveCompleted { target, bytes } => {
                self.view.last_save = Some(SaveOutcome::Saved { target, bytes });
            }
            Notification::SaveFailed { target, reason } => {
                self.view.last_save = Some(SaveOutcome::Failed { target, reason });
            }
            Notification::OverlaySelect(overlay) => {
                log::debug!("panel: overlay {} picked", overlay.uid);
            }
        }
    }

    /// Record a save outcome and tell the canvas about it.
    pub fn report_save(&mut self, outcome: SaveOutcome) -> Result<(), ProtocolError> {
        self.view.last_save = Some(outcome.clone());
        self.port.send(Notification::from(outcome))
    }

    // ─── Actions ─────────────────────────────────────────────────────────

    pub fn select_layer(&mut self, index: usize) -> Result<(), ProtocolError> {
        self.view.selected_layer = Some(index);
        self.send(Command::SelectLayer { index })
    }

    pub fn add_layer(&self) -> Result<(), ProtocolError> {
        self.send(Command::AddLayer { layer: None })
    }

    pub fn remove_layer(&self) -> Result<(), ProtocolError> {
        self.send(Command::RemoveLayer {
            layer_index: self.mirror.current_layer,
        })
    }

    pub fn add_overlay(&self) -> Result<(), ProtocolError> {
        self.send(Command::AddOverlay {
            layer_index: self.mirror.current_layer,
        })
    }

    pub fn remove_overlay(&self) -> Result<(), ProtocolError> {
        let current = self.mirror.current_overlay;
        self.send(Command::RemoveOverlay {
            layer_index: current.map(|at| at.layer_index).or(self.mirror.current_layer),
            overlay_index: current.map(|at| at.overlay_index),
        })
    }

    /// Edit the class field. Does nothing without a form.
    pub fn edit_class(&mut self, value: &str) -> Result<(), ProtocolError> {
        let Some(form) = self.view.form.as_mut() else {
            return Ok(());
        };
        form.class = value.to_string();
        let at = form.at;
        self.update_overlay(at, OverlayPatch::class(value))
    }

    /// Edit the target field. Does nothing without a form.
    pub fn edit_target(&mut self, value: &str) -> Result<(), ProtocolError> {
        let Some(form) = self.view.form.as_mut() else {
            return Ok(());
        };
        form.target = value.to_string();
        let at = form.at;
        self.update_overlay(at, OverlayPatch::target(value))
    }

    pub fn save(&self) -> Result<(), ProtocolError> {
        self.send(Command::RequestSave)
    }

    pub fn set_edit_mode(&mut self, enabled: bool) -> Result<(), ProtocolError> {
        self.view.edit_mode = enabled;
        self.send(Command::EditMode { enabled })
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn send(&self, command: Command) -> Result<(), ProtocolError> {
        self.port.send(command)
    }

    fn update_overlay(&self, at: OverlayRef, patch: OverlayPatch) -> Result<(), ProtocolError> {
        self.send(Command::UpdateOverlay {
            layer_index: Some(at.layer_index),
            overlay_index: Some(at.overlay_index),
            updated_overlay: patch,
        })
    }

    fn refresh_layers(&mut self) {
        self.view.layers = layer_options(self.mirror.slide.as_deref());
        self.view.selected_layer = self.mirror.current_layer;
    }

    fn build_form(&mut self, at: OverlayRef) {
        match self.mirror.overlay(at) {
            Some(overlay) => {
                self.view.form = Some(OverlayForm {
                    at,
                    uid: overlay.uid,
                    class: overlay.class.clone().unwrap_or_default(),
                    target: overlay.target.clone().unwrap_or_default(),
                });
                self.view.form_generation += 1;
                self.pending_form = None;
            }
            None => {
                // The broadcast carrying this overlay has not arrived yet.
                self.view.form = None;
                self.pending_form = Some(at);
            }
        }
    }

    /// The form's position no longer holds the overlay it was built from.
    fn form_is_stale(&self) -> bool {
        self.view
            .form
            .as_ref()
            .is_some_and(|form| self.mirror.overlay(form.at).map(|o| o.uid) != Some(form.uid))
    }

    fn clear_form(&mut self) {
        self.view.form = None;
        self.pending_form = None;
    }
}
