//! Canvas host: the editor side of the boundary.
//!
//! Holds the store, the interaction controller, the canvas-local bus and the
//! boundary port towards the control panel. All interaction from the
//! embedding page goes through this struct.

use crate::boundary::BoundaryPort;
use crate::bus::LocalBus;
use crate::gesture::{ClickAction, InteractionController, PointerCapture};
use crate::input::{HitTarget, InputEvent};
use crate::protocol::{Command, Event, Notification};
use crate::store::SlideStore;
use slide_core::{ContainerRect, OverlayRef, Selection};
use std::rc::Rc;

pub struct CanvasHost {
    store: SlideStore,
    controller: InteractionController,
    bus: LocalBus<Event>,
    port: BoundaryPort,
}

impl CanvasHost {
    /// Wire a host around `store`. The store's initial broadcast goes out on
    /// the first [`flush`](Self::flush).
    pub fn new(store: SlideStore, port: BoundaryPort, capture: Rc<dyn PointerCapture>) -> Self {
        Self {
            store,
            controller: InteractionController::new(capture),
            bus: LocalBus::new(),
            port,
        }
    }

    pub fn store(&self) -> &SlideStore {
        &self.store
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// The canvas-local bus. Renderers subscribe here.
    pub fn bus(&self) -> &LocalBus<Event> {
        &self.bus
    }

    pub fn set_container(&mut self, container: ContainerRect) {
        self.controller.set_container(container);
    }

    /// Interpret one command against the store.
    ///
    /// Missing indices default to the current selection; a command that still
    /// has no target is dropped with a warning.
    pub fn dispatch(&mut self, command: Command) {
        log::debug!("canvas: {}", command.name());
        let selection = self.store.selection();
        let current_layer = selection.layer_index();

        // Rejections are logged by the store.
        let _ = match command {
            Command::AddLayer { layer } => {
                self.store.add_layer(layer);
                Ok(())
            }
            Command::RemoveLayer { layer_index } => match layer_index.or(current_layer) {
                Some(index) => self.store.remove_layer(index),
                None => {
                    dropped("remove-layer");
                    Ok(())
                }
            },
            Command::UpdateLayer {
                layer_index,
                updated_layer,
            } => match layer_index.or(current_layer) {
                Some(index) => self.store.update_layer(index, &updated_layer),
                None => {
                    dropped("update-layer");
                    Ok(())
                }
            },
            Command::SelectLayer { index } => self.store.select_layer_or_first_overlay(index),
            Command::AddOverlay { layer_index } => self
                .store
                .add_overlay(layer_index.or(current_layer).unwrap_or(0))
                .map(|_| ()),
            Command::RemoveOverlay {
                layer_index,
                overlay_index,
            } => match resolve_overlay(layer_index, overlay_index, selection) {
                Some(at) => self.store.remove_overlay(at),
                None => {
                    dropped("remove-overlay");
                    Ok(())
                }
            },
            Command::UpdateOverlay {
                layer_index,
                overlay_index,
                updated_overlay,
            } => match resolve_overlay(layer_index, overlay_index, selection) {
                Some(at) => self.store.update_overlay(at, &updated_overlay),
                None => {
                    dropped("update-overlay");
                    Ok(())
                }
            },
            Command::RequestSave => {
                self.store.request_save();
                Ok(())
            }
            Command::RequestLoad => {
                self.store.request_load();
                Ok(())
            }
            Command::EditMode { enabled } => {
                self.controller.set_edit_mode(enabled);
                Ok(())
            }
        };
        self.flush();
    }

    /// Feed a pointer event through the interaction controller.
    pub fn pointer(&mut self, event: InputEvent, hit: Option<HitTarget>) {
        for mutation in self.controller.handle(&event, hit, &self.store) {
            let _ = self.store.apply_mutation(mutation);
        }
        self.flush();
    }

    /// Resolve a click. In edit mode the pick is published as
    /// `overlay-select`; otherwise the caller navigates to the returned target.
    pub fn click(&mut self, hit: HitTarget) -> Option<ClickAction> {
        let action = self.controller.click(hit, &self.store)?;
        if let ClickAction::Pick(overlay) = &action {
            self.publish(Notification::OverlaySelect(overlay.clone()));
        }
        Some(action)
    }

    /// Process every event waiting on the boundary port. Returns how many
    /// were handled.
    pub fn pump(&mut self) -> usize {
        let events = self.port.drain();
        let count = events.len();
        for event in events {
            match event {
                Event::Command(command) => self.dispatch(command),
                Event::Notification(notification) => self.receive(notification),
            }
        }
        count
    }

    /// Publish everything the store has queued.
    pub fn flush(&mut self) {
        for notification in self.store.take_notifications() {
            self.publish(notification);
        }
    }

    /// Release gesture listeners before the canvas goes away.
    pub fn teardown(&mut self) {
        self.controller.teardown();
    }

    fn receive(&mut self, notification: Notification) {
        match &notification {
            Notification::SaveCompleted { target, bytes } => {
                log::info!("saved {target} ({bytes} bytes)");
            }
            Notification::SaveFailed { target, reason } => {
                log::error!("save of {target} failed: {reason}");
            }
            other => {
                log::debug!("canvas: ignoring inbound {}", other.name());
                return;
            }
        }
        self.bus.publish(Event::Notification(notification));
    }

    fn publish(&self, notification: Notification) {
        let event = Event::Notification(notification);
        if let Err(e) = self.port.send(event.clone()) {
            log::warn!("canvas: {} not delivered: {e}", event.name());
        }
        self.bus.publish(event);
    }
}

fn resolve_overlay(
    layer_index: Option<usize>,
    overlay_index: Option<usize>,
    selection: Selection,
) -> Option<OverlayRef> {
    let layer = layer_index.or(selection.layer_index())?;
    match (overlay_index, selection.overlay()) {
        (Some(o), _) => Some(OverlayRef::new(layer, o)),
        (None, Some(sel)) if sel.layer_index == layer => Some(sel),
        _ => None,
    }
}

fn dropped(name: &str) {
    log::warn!("canvas: {name} has no target and nothing is selected; dropped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::boundary_pair;
    use crate::gesture::WindowListeners;
    use pretty_assertions::assert_eq;
    use slide_core::{EditorConfig, LayerPatch, OverlayPatch, Slide};
    use std::cell::RefCell;

    fn host() -> (CanvasHost, BoundaryPort) {
        let (canvas, panel) = boundary_pair("canvas", "panel");
        let store = SlideStore::new(Slide::new(), EditorConfig::default());
        let host = CanvasHost::new(store, canvas, Rc::new(WindowListeners::new()));
        (host, panel)
    }

    fn names(events: &[Event]) -> Vec<&'static str> {
        events.iter().map(Event::name).collect()
    }

    #[test]
    fn flush_sends_initial_state() {
        let (mut host, mut panel) = host();
        host.flush();
        assert_eq!(names(&panel.drain()), vec!["slide-updated", "layer-selected"]);
    }

    #[test]
    fn missing_indices_default_to_selection() {
        let (mut host, _panel) = host();
        host.dispatch(Command::AddOverlay { layer_index: None });
        host.dispatch(Command::UpdateOverlay {
            layer_index: None,
            overlay_index: None,
            updated_overlay: OverlayPatch::class("pulse"),
        });
        let overlay = host.store().overlay(OverlayRef::new(0, 0)).unwrap();
        assert_eq!(overlay.class.as_deref(), Some("pulse"));

        host.dispatch(Command::RemoveOverlay {
            layer_index: None,
            overlay_index: None,
        });
        assert_eq!(host.store().slide().overlay_count(), 0);
        assert_eq!(host.store().selection(), Selection::Layer(0));
    }

    #[test]
    fn update_layer_defaults_to_selected_layer() {
        let (mut host, _panel) = host();
        host.dispatch(Command::AddLayer { layer: None });
        assert_eq!(host.store().selection(), Selection::Layer(1));

        host.dispatch(Command::UpdateLayer {
            layer_index: None,
            updated_layer: LayerPatch {
                id: Some("popup".into()),
                ..LayerPatch::default()
            },
        });
        let labels: Vec<_> = host.store().slide().layers.iter().map(|l| l.label()).collect();
        assert_eq!(labels, vec!["default", "popup"]);
    }

    #[test]
    fn targetless_overlay_command_is_dropped() {
        let (mut host, mut panel) = host();
        host.flush();
        panel.drain();
        host.dispatch(Command::RemoveOverlay {
            layer_index: Some(0),
            overlay_index: None,
        });
        assert!(panel.drain().is_empty());
    }

    #[test]
    fn rejected_command_publishes_nothing() {
        let (mut host, mut panel) = host();
        host.flush();
        panel.drain();
        host.dispatch(Command::RemoveLayer { layer_index: Some(0) });
        assert!(panel.drain().is_empty());
        assert_eq!(host.store().slide().layers.len(), 1);
    }

    #[test]
    fn local_bus_sees_what_the_panel_sees() {
        let (mut host, mut panel) = host();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = host.bus().subscribe_all(move |e: &Event| sink.borrow_mut().push(e.name()));

        host.dispatch(Command::AddLayer { layer: None });
        assert_eq!(*seen.borrow(), names(&panel.drain()));
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn pump_dispatches_commands_from_the_panel() {
        let (mut host, panel) = host();
        panel.send(Command::EditMode { enabled: true }).unwrap();
        panel.send(Command::AddLayer { layer: None }).unwrap();
        assert_eq!(host.pump(), 2);
        assert!(host.controller().is_edit_mode());
        assert_eq!(host.store().slide().layers.len(), 2);
    }

    #[test]
    fn save_request_carries_snapshot() {
        let (mut host, mut panel) = host();
        host.flush();
        panel.drain();
        host.dispatch(Command::RequestSave);
        match panel.drain().as_slice() {
            [Event::Notification(Notification::SaveSlide { slide })] => {
                assert_eq!(slide.uid, host.store().slide().uid);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn edit_mode_click_publishes_overlay_select() {
        let (mut host, mut panel) = host();
        host.dispatch(Command::AddOverlay { layer_index: Some(0) });
        host.dispatch(Command::EditMode { enabled: true });
        panel.drain();

        let action = host.click(HitTarget::body(0, 0));
        assert!(matches!(action, Some(ClickAction::Pick(_))));
        assert_eq!(names(&panel.drain()), vec!["overlay-select"]);
    }
}
