//! Slide state store: the single writer of the slide document.
//!
//! The store lives in the canvas context and owns the canonical `Slide`
//! together with the `Selection`. The interaction controller feeds it
//! mutations; the control panel and the persistence bridge only read the
//! snapshots it publishes.
//!
//! - **Snapshots**: the slide is held as an `Arc<Slide>`. A mutation writes
//!   through `Arc::make_mut`, so any snapshot already handed out (in a
//!   notification, on the bus) is cloned away from rather than modified.
//!
//! - **Notifications**: every successful mutation queues a `slide-updated`
//!   broadcast, followed by one selection narrowcast when the selection
//!   changed. Rejected mutations queue nothing. The host drains the queue
//!   with [`SlideStore::take_notifications`].
//!
//! - **Selection repair**: after every mutation an overlay selection that no
//!   longer points at an overlay is clamped to the last overlay of its layer,
//!   or falls back to selecting the layer when it has none.
//!
//! Other contexts address overlays by position, so the narrowcast is keyed on
//! the selected overlay's uid as well as its position: removing an overlay
//! below the selection leaves the index unchanged but moves it onto another
//! overlay, and that counts as a selection change.

use crate::protocol::Notification;
use slide_core::{
    EditorConfig, Layer, LayerPatch, Overlay, OverlayPatch, OverlayRef, Selection, Slide,
    SlideError, Uid, decode_slide, lint_slide,
};
use std::sync::Arc;
use thiserror::Error;

/// A structural violation. The mutation was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("layer 0 is the default layer and cannot be removed")]
    ProtectedLayer,
    #[error("at least one layer must remain")]
    LastLayer,
    #[error("no layer at index {0}")]
    NoSuchLayer(usize),
    #[error("no overlay at layer {layer_index}, index {overlay_index}")]
    NoSuchOverlay {
        layer_index: usize,
        overlay_index: usize,
    },
}

/// A mutation that can be applied to the store, e.g. from canvas gestures.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideMutation {
    AddLayer { layer: Option<LayerPatch> },
    RemoveLayer { index: usize },
    UpdateLayer { index: usize, patch: LayerPatch },
    AddOverlay { layer_index: usize },
    RemoveOverlay { at: OverlayRef },
    UpdateOverlay { at: OverlayRef, patch: OverlayPatch },
    SelectLayer { index: usize },
    SelectOverlay { at: OverlayRef },
}

/// The store holds the authoritative slide and selection.
pub struct SlideStore {
    slide: Arc<Slide>,
    selection: Selection,
    /// Uid of the selected overlay as of the last commit.
    announced_uid: Option<Uid>,
    config: EditorConfig,
    outbox: Vec<Notification>,
}

impl SlideStore {
    /// Create a store from an in-memory slide. The slide is normalized, the
    /// default layer is selected, and the initial broadcast is queued.
    pub fn new(mut slide: Slide, config: EditorConfig) -> Self {
        slide.normalize(&config);
        for diag in lint_slide(&slide) {
            log::debug!("[{}] {}", diag.rule, diag.message);
        }

        let mut store = Self {
            slide: Arc::new(slide),
            selection: Selection::Layer(0),
            announced_uid: None,
            config,
            outbox: Vec::new(),
        };
        let initial = store.snapshot();
        let selected = store.narrowcast();
        store.outbox.push(initial);
        store.outbox.extend(selected);
        store
    }

    /// Create a store from a persisted slide record.
    pub fn from_json(json: &str, config: EditorConfig) -> Result<Self, SlideError> {
        let slide = decode_slide(json, &config)?;
        Ok(Self::new(slide, config))
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn slide(&self) -> &Arc<Slide> {
        &self.slide
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn overlay(&self, at: OverlayRef) -> Option<&Overlay> {
        self.slide.overlay(at)
    }

    /// Uid of the selected overlay, if an overlay is selected.
    pub fn selected_uid(&self) -> Option<Uid> {
        self.overlay(self.selection.overlay()?).map(|o| o.uid)
    }

    /// The full-state broadcast for the current slide and selection.
    pub fn snapshot(&self) -> Notification {
        Notification::SlideUpdated {
            slide: Arc::clone(&self.slide),
            selected_layer_index: self.selection.layer_index(),
            selected_overlay_index: self.selection.overlay(),
        }
    }

    /// Take every notification queued since the last call, in order.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply a mutation, logging and returning the error if it is rejected.
    pub fn apply_mutation(&mut self, mutation: SlideMutation) -> Result<(), StoreError> {
        match mutation {
            SlideMutation::AddLayer { layer } => {
                self.add_layer(layer);
                Ok(())
            }
            SlideMutation::RemoveLayer { index } => self.remove_layer(index),
            SlideMutation::UpdateLayer { index, patch } => self.update_layer(index, &patch),
            SlideMutation::AddOverlay { layer_index } => self.add_overlay(layer_index).map(|_| ()),
            SlideMutation::RemoveOverlay { at } => self.remove_overlay(at),
            SlideMutation::UpdateOverlay { at, patch } => self.update_overlay(at, &patch),
            SlideMutation::SelectLayer { index } => self.select_layer(index),
            SlideMutation::SelectOverlay { at } => self.select_overlay(at),
        }
    }

    /// Append a layer (`level = count + 1`, id `layer-{count + 1}`) with
    /// `partial` overriding the defaults, and select it.
    pub fn add_layer(&mut self, partial: Option<LayerPatch>) -> Layer {
        let count = self.slide.layers.len();
        let level = i32::try_from(count + 1).unwrap_or(i32::MAX);
        let mut layer = Layer::new(format!("layer-{}", count + 1), level);
        if let Some(patch) = partial {
            layer.apply_patch(&patch);
            constrain_overlays(&mut layer);
        }

        Arc::make_mut(&mut self.slide).layers.push(layer.clone());
        self.commit(Selection::Layer(count));
        layer
    }

    /// Remove the layer at `index`.
    ///
    /// Rejected for the default layer (index 0), for the last remaining
    /// layer, and for an index past the end.
    pub fn remove_layer(&mut self, index: usize) -> Result<(), StoreError> {
        let count = self.slide.layers.len();
        if index == 0 {
            return Err(reject(StoreError::ProtectedLayer));
        }
        if count <= 1 {
            return Err(reject(StoreError::LastLayer));
        }
        if index >= count {
            return Err(reject(StoreError::NoSuchLayer(index)));
        }

        let current = self.selection.layer_index().unwrap_or(0);
        let new_layer = if current == index {
            index.saturating_sub(1)
        } else if current > index {
            current - 1
        } else {
            current
        };

        let slide = Arc::make_mut(&mut self.slide);
        slide.layers.remove(index);

        let selection = match self.selection {
            Selection::Overlay(at) if at.layer_index == index => {
                if slide.layers.get(new_layer).is_some_and(|l| !l.overlays.is_empty()) {
                    Selection::Overlay(OverlayRef::new(new_layer, 0))
                } else {
                    Selection::Layer(new_layer)
                }
            }
            Selection::Overlay(at) if at.layer_index > index => {
                Selection::Overlay(OverlayRef::new(at.layer_index - 1, at.overlay_index))
            }
            Selection::Overlay(at) => Selection::Overlay(at),
            Selection::Layer(_) => Selection::Layer(new_layer),
            Selection::None => Selection::None,
        };
        self.commit(selection);
        Ok(())
    }

    /// Merge `patch` into the layer at `index`.
    pub fn update_layer(&mut self, index: usize, patch: &LayerPatch) -> Result<(), StoreError> {
        if index >= self.slide.layers.len() {
            return Err(reject(StoreError::NoSuchLayer(index)));
        }
        let layer = &mut Arc::make_mut(&mut self.slide).layers[index];
        layer.apply_patch(patch);
        constrain_overlays(layer);
        self.commit(self.selection);
        Ok(())
    }

    /// Append an overlay with the configured default geometry to the layer
    /// and select it.
    pub fn add_overlay(&mut self, layer_index: usize) -> Result<Overlay, StoreError> {
        if layer_index >= self.slide.layers.len() {
            return Err(reject(StoreError::NoSuchLayer(layer_index)));
        }
        let overlay = Overlay::new(self.config.new_overlay, self.config.new_overlay_kind);
        let overlays = &mut Arc::make_mut(&mut self.slide).layers[layer_index].overlays;
        overlays.push(overlay.clone());
        let at = OverlayRef::new(layer_index, overlays.len() - 1);
        self.commit(Selection::Overlay(at));
        Ok(overlay)
    }

    /// Remove an overlay by position. The selection is left as-is and
    /// corrected by the repair pass if it now dangles.
    pub fn remove_overlay(&mut self, at: OverlayRef) -> Result<(), StoreError> {
        self.check_overlay(at)?;
        Arc::make_mut(&mut self.slide).layers[at.layer_index]
            .overlays
            .remove(at.overlay_index);
        self.commit(self.selection);
        Ok(())
    }

    /// Merge `patch` into an overlay. Geometry is kept inside the canvas.
    ///
    /// This is the hot path during drag/resize: one call per pointer frame.
    pub fn update_overlay(
        &mut self,
        at: OverlayRef,
        patch: &OverlayPatch,
    ) -> Result<(), StoreError> {
        self.check_overlay(at)?;
        let overlay =
            &mut Arc::make_mut(&mut self.slide).layers[at.layer_index].overlays[at.overlay_index];
        overlay.apply_patch(patch);
        if patch.touches_geometry() {
            overlay.set_rect(overlay.rect().constrained());
        }
        self.commit(self.selection);
        Ok(())
    }

    /// Select a layer (clears any overlay selection).
    pub fn select_layer(&mut self, index: usize) -> Result<(), StoreError> {
        if index >= self.slide.layers.len() {
            return Err(reject(StoreError::NoSuchLayer(index)));
        }
        self.select(Selection::Layer(index));
        Ok(())
    }

    /// Select a layer the way the layer picker does: its first overlay if it
    /// has any, otherwise the layer itself.
    pub fn select_layer_or_first_overlay(&mut self, index: usize) -> Result<(), StoreError> {
        let Some(layer) = self.slide.layer(index) else {
            return Err(reject(StoreError::NoSuchLayer(index)));
        };
        let selection = if layer.overlays.is_empty() {
            Selection::Layer(index)
        } else {
            Selection::Overlay(OverlayRef::new(index, 0))
        };
        self.select(selection);
        Ok(())
    }

    pub fn select_overlay(&mut self, at: OverlayRef) -> Result<(), StoreError> {
        self.check_overlay(at)?;
        self.select(Selection::Overlay(at));
        Ok(())
    }

    /// Queue a `save-slide` carrying the current snapshot.
    pub fn request_save(&mut self) {
        self.outbox.push(Notification::SaveSlide {
            slide: Arc::clone(&self.slide),
        });
    }

    /// Queue a `load-slide` carrying the current snapshot.
    pub fn request_load(&mut self) {
        self.outbox.push(Notification::LoadSlide {
            slide: Arc::clone(&self.slide),
        });
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn check_overlay(&self, at: OverlayRef) -> Result<(), StoreError> {
        if self.slide.overlay(at).is_some() {
            Ok(())
        } else {
            Err(reject(StoreError::NoSuchOverlay {
                layer_index: at.layer_index,
                overlay_index: at.overlay_index,
            }))
        }
    }

    /// Selection-only change: broadcast only if something actually changed.
    fn select(&mut self, selection: Selection) {
        let repaired = repair_selection(&self.slide, selection);
        if repaired != self.selection || self.announced_uid != self.selected_uid() {
            self.commit(selection);
        }
    }

    /// Finish a mutation: repair the selection and queue notifications.
    fn commit(&mut self, selection: Selection) {
        let previous = (self.selection, self.announced_uid);
        self.selection = repair_selection(&self.slide, selection);
        self.announced_uid = self.selected_uid();
        let snapshot = self.snapshot();
        self.outbox.push(snapshot);
        if (self.selection, self.announced_uid) != previous {
            let selected = self.narrowcast();
            self.outbox.extend(selected);
        }
    }

    fn narrowcast(&self) -> Option<Notification> {
        match self.selection {
            Selection::Overlay(at) => Some(Notification::OverlaySelected {
                layer_index: at.layer_index,
                overlay_index: at.overlay_index,
            }),
            Selection::Layer(layer_index) => Some(Notification::LayerSelected { layer_index }),
            Selection::None => None,
        }
    }
}

fn reject(err: StoreError) -> StoreError {
    log::warn!("rejected: {err}");
    err
}

fn constrain_overlays(layer: &mut Layer) {
    for overlay in &mut layer.overlays {
        overlay.set_rect(overlay.rect().constrained());
    }
}

/// Make `selection` point at something that exists in `slide`.
pub fn repair_selection(slide: &Slide, selection: Selection) -> Selection {
    let Some(last_layer) = slide.layers.len().checked_sub(1) else {
        return Selection::None;
    };
    match selection {
        Selection::None => Selection::None,
        Selection::Layer(index) => Selection::Layer(index.min(last_layer)),
        Selection::Overlay(at) => match slide.layers.get(at.layer_index) {
            None => Selection::Layer(last_layer),
            Some(layer) if at.overlay_index < layer.overlays.len() => Selection::Overlay(at),
            Some(layer) => match layer.overlays.len().checked_sub(1) {
                Some(last) => Selection::Overlay(OverlayRef::new(at.layer_index, last)),
                None => Selection::Layer(at.layer_index),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slide_core::{OverlayKind, PercentRect, Uid};

    fn store() -> SlideStore {
        let mut store = SlideStore::new(Slide::new(), EditorConfig::default());
        store.take_notifications();
        store
    }

    fn names(notifications: &[Notification]) -> Vec<&'static str> {
        notifications.iter().map(Notification::name).collect()
    }

    #[test]
    fn new_store_has_default_layer_selected() {
        let mut store = SlideStore::new(Slide::new(), EditorConfig::default());
        assert_eq!(store.slide().layers.len(), 1);
        assert_eq!(store.slide().layers[0].id.as_deref(), Some("default"));
        assert_eq!(store.selection(), Selection::Layer(0));
        assert_eq!(names(&store.take_notifications()), vec!["slide-updated", "layer-selected"]);
    }

    #[test]
    fn add_overlay_uses_default_geometry_and_selects_it() {
        let mut store = store();
        let overlay = store.add_overlay(0).unwrap();
        assert_eq!(overlay.rect(), PercentRect::new(45.0, 47.5, 10.0, 5.0));
        assert_eq!(overlay.kind, OverlayKind::Hotspot);
        assert_eq!(store.selection(), Selection::Overlay(OverlayRef::new(0, 0)));
        assert_eq!(
            names(&store.take_notifications()),
            vec!["slide-updated", "overlay-selected"]
        );
    }

    #[test]
    fn add_layer_defaults_and_overrides() {
        let mut store = store();
        let layer = store.add_layer(None);
        assert_eq!(layer.id.as_deref(), Some("layer-2"));
        assert_eq!(layer.level, 2);
        assert!(layer.overlays.is_empty());
        assert_eq!(store.selection(), Selection::Layer(1));

        let layer = store.add_layer(Some(LayerPatch {
            id: Some("popup".into()),
            display: Some(false),
            ..LayerPatch::default()
        }));
        assert_eq!(layer.id.as_deref(), Some("popup"));
        assert_eq!(layer.level, 3);
        assert!(!layer.display);
    }

    #[test]
    fn remove_layer_zero_is_always_rejected() {
        let mut store = store();
        assert_eq!(store.remove_layer(0), Err(StoreError::ProtectedLayer));
        store.add_layer(None);
        store.add_layer(None);
        store.take_notifications();
        assert_eq!(store.remove_layer(0), Err(StoreError::ProtectedLayer));
        assert_eq!(store.slide().layers.len(), 3);
        assert!(store.take_notifications().is_empty());
    }

    #[test]
    fn remove_layer_rejects_out_of_range() {
        let mut store = store();
        store.add_layer(None);
        assert_eq!(store.remove_layer(5), Err(StoreError::NoSuchLayer(5)));
    }

    #[test]
    fn add_then_remove_layer_restores_uids() {
        let mut store = store();
        store.add_layer(None);
        let before: Vec<Uid> = store.slide().layers.iter().map(|l| l.uid).collect();
        store.add_layer(None);
        store.remove_layer(2).unwrap();
        let after: Vec<Uid> = store.slide().layers.iter().map(|l| l.uid).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn remove_selected_layer_rehomes_overlay_selection() {
        let mut store = store();
        store.add_overlay(0).unwrap();
        store.add_layer(None);
        store.add_overlay(1).unwrap();
        assert_eq!(store.selection(), Selection::Overlay(OverlayRef::new(1, 0)));

        store.remove_layer(1).unwrap();
        // Layer 0 still has an overlay, so it takes the selection.
        assert_eq!(store.selection(), Selection::Overlay(OverlayRef::new(0, 0)));
    }

    #[test]
    fn remove_selected_layer_falls_back_to_layer_selection() {
        let mut store = store();
        store.add_layer(None);
        store.add_overlay(1).unwrap();
        store.remove_layer(1).unwrap();
        assert_eq!(store.selection(), Selection::Layer(0));
    }

    #[test]
    fn remove_lower_layer_shifts_overlay_selection() {
        let mut store = store();
        store.add_layer(None);
        store.add_layer(None);
        store.add_overlay(2).unwrap();
        store.remove_layer(1).unwrap();
        assert_eq!(store.selection(), Selection::Overlay(OverlayRef::new(1, 0)));
        assert_eq!(store.slide().layers.len(), 2);
    }

    #[test]
    fn removing_selected_overlay_clamps_selection() {
        let mut store = store();
        store.add_layer(None);
        for _ in 0..3 {
            store.add_overlay(1).unwrap();
        }
        assert_eq!(store.selection(), Selection::Overlay(OverlayRef::new(1, 2)));

        store.remove_overlay(OverlayRef::new(1, 2)).unwrap();
        assert_eq!(store.selection(), Selection::Overlay(OverlayRef::new(1, 1)));

        store.remove_overlay(OverlayRef::new(1, 1)).unwrap();
        store.remove_overlay(OverlayRef::new(1, 0)).unwrap();
        assert_eq!(store.selection(), Selection::Layer(1));
    }

    #[test]
    fn removing_a_lower_overlay_renarrowcasts_the_selection() {
        let mut store = store();
        for target in ["/a", "/b", "/c"] {
            store.add_overlay(0).unwrap();
            let at = store.selection().overlay().unwrap();
            store.update_overlay(at, &OverlayPatch::target(target)).unwrap();
        }
        store.select_overlay(OverlayRef::new(0, 1)).unwrap();
        store.take_notifications();

        store.remove_overlay(OverlayRef::new(0, 0)).unwrap();

        // Same position, different overlay: the panel must hear about it.
        assert_eq!(store.selection(), Selection::Overlay(OverlayRef::new(0, 1)));
        let selected = store.overlay(OverlayRef::new(0, 1)).unwrap();
        assert_eq!(selected.target.as_deref(), Some("/c"));
        assert_eq!(store.selected_uid(), Some(selected.uid));
        assert_eq!(
            names(&store.take_notifications()),
            vec!["slide-updated", "overlay-selected"]
        );
    }

    #[test]
    fn removing_a_higher_overlay_keeps_selection_quiet() {
        let mut store = store();
        store.add_overlay(0).unwrap();
        store.add_overlay(0).unwrap();
        store.select_overlay(OverlayRef::new(0, 0)).unwrap();
        store.take_notifications();

        store.remove_overlay(OverlayRef::new(0, 1)).unwrap();
        assert_eq!(names(&store.take_notifications()), vec!["slide-updated"]);
    }

    #[test]
    fn update_layer_merges_fields() {
        let mut store = store();
        store.add_layer(None);
        let uid = store.slide().layers[1].uid;
        store.take_notifications();

        store
            .update_layer(
                1,
                &LayerPatch {
                    id: Some("popup".into()),
                    display: Some(false),
                    ..LayerPatch::default()
                },
            )
            .unwrap();

        let layer = &store.slide().layers[1];
        assert_eq!(layer.uid, uid);
        assert_eq!(layer.id.as_deref(), Some("popup"));
        assert!(!layer.display);
        assert_eq!(layer.level, 2);
        // Selection is untouched, so only the broadcast goes out.
        assert_eq!(names(&store.take_notifications()), vec!["slide-updated"]);
    }

    #[test]
    fn update_layer_constrains_supplied_overlays() {
        let mut store = store();
        let wide = Overlay::new(PercentRect::new(95.0, 98.0, 20.0, 10.0), OverlayKind::Hotspot);
        store
            .update_layer(
                0,
                &LayerPatch {
                    overlays: Some(vec![wide]),
                    ..LayerPatch::default()
                },
            )
            .unwrap();

        let rect = store.overlay(OverlayRef::new(0, 0)).unwrap().rect();
        assert_eq!(rect, PercentRect::new(80.0, 90.0, 20.0, 10.0));
        assert!(rect.is_within_bounds());
    }

    #[test]
    fn update_layer_rejects_bad_index() {
        let mut store = store();
        let before = Arc::clone(store.slide());
        assert_eq!(
            store.update_layer(3, &LayerPatch::default()),
            Err(StoreError::NoSuchLayer(3))
        );
        assert_eq!(*store.slide(), before);
        assert!(store.take_notifications().is_empty());
    }

    #[test]
    fn update_overlay_merges_and_constrains() {
        let mut store = store();
        store.add_overlay(0).unwrap();
        let at = OverlayRef::new(0, 0);
        let uid = store.overlay(at).unwrap().uid;

        store.update_overlay(at, &OverlayPatch::target("/slides/3")).unwrap();
        store
            .update_overlay(
                at,
                &OverlayPatch {
                    left: Some(98.0),
                    ..OverlayPatch::default()
                },
            )
            .unwrap();

        let overlay = store.overlay(at).unwrap();
        assert_eq!(overlay.uid, uid);
        assert_eq!(overlay.target.as_deref(), Some("/slides/3"));
        assert_eq!(overlay.left, 90.0);
    }

    #[test]
    fn update_on_missing_overlay_is_rejected() {
        let mut store = store();
        assert_eq!(
            store.update_overlay(OverlayRef::new(0, 4), &OverlayPatch::class("x")),
            Err(StoreError::NoSuchOverlay {
                layer_index: 0,
                overlay_index: 4
            })
        );
    }

    #[test]
    fn snapshots_are_not_aliased() {
        let mut store = store();
        store.add_overlay(0).unwrap();
        let before = Arc::clone(store.slide());
        store
            .update_overlay(OverlayRef::new(0, 0), &OverlayPatch::class("changed"))
            .unwrap();
        assert_eq!(before.layers[0].overlays[0].class, None);
        assert_eq!(
            store.slide().layers[0].overlays[0].class.as_deref(),
            Some("changed")
        );
    }

    #[test]
    fn reselecting_the_same_layer_is_silent() {
        let mut store = store();
        store.select_layer(0).unwrap();
        assert!(store.take_notifications().is_empty());
    }

    #[test]
    fn select_layer_or_first_overlay() {
        let mut store = store();
        store.add_layer(None);
        store.add_overlay(1).unwrap();
        store.select_layer(0).unwrap();
        store.select_layer_or_first_overlay(1).unwrap();
        assert_eq!(store.selection(), Selection::Overlay(OverlayRef::new(1, 0)));
        store.select_layer_or_first_overlay(0).unwrap();
        assert_eq!(store.selection(), Selection::Layer(0));
    }

    #[test]
    fn repair_handles_missing_layer() {
        let mut slide = Slide::new();
        slide.layers.push(Layer::new("default", 1));
        assert_eq!(
            repair_selection(&slide, Selection::Overlay(OverlayRef::new(3, 1))),
            Selection::Layer(0)
        );
        assert_eq!(repair_selection(&slide, Selection::Layer(7)), Selection::Layer(0));
    }
}
