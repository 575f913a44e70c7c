//! Direct manipulation of overlays on the canvas.
//!
//! Translates pointer input into `SlideMutation`s applied by the store.
//! Drag and resize are independent state machines, each idle → active → idle.
//!
//! | Input | Idle | Active |
//! |-------|------|--------|
//! | pointer-down on body | select; start drag (edit mode) | cancel, then as idle |
//! | pointer-down on handle | select; start resize (edit mode) | cancel, then as idle |
//! | pointer-move | — | geometry-only `update-overlay` |
//! | pointer-up / cancel / focus-lost | — | end |
//!
//! While a gesture is active the window-wide move/up listeners are held by a
//! [`CaptureGuard`]; dropping the guard releases them, so every way out of
//! the active state (including dropping the controller) cleans up.
//! Geometry already applied is never rolled back.
//!
//! A gesture remembers the uid of the overlay it started on. If a mutation
//! shifts that overlay to another position mid-gesture, the gesture follows
//! it; if the overlay is removed, the gesture ends.

use crate::input::{Handle, HitTarget, InputEvent};
use crate::store::{SlideMutation, SlideStore};
use slide_core::{
    ContainerRect, Overlay, OverlayPatch, OverlayRef, PercentRect, PointerDelta, Uid,
    compute_drag, compute_resize,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ─── Pointer capture ─────────────────────────────────────────────────────

/// Identifies one acquisition of the global pointer listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureToken(pub u64);

/// Registers and removes the window-wide pointer listeners a gesture needs
/// once the pointer leaves the overlay.
pub trait PointerCapture {
    fn acquire(&self) -> CaptureToken;
    fn release(&self, token: CaptureToken);
}

/// Holds one acquisition; releases it on drop.
pub struct CaptureGuard {
    capture: Rc<dyn PointerCapture>,
    token: CaptureToken,
}

impl CaptureGuard {
    pub fn acquire(capture: &Rc<dyn PointerCapture>) -> Self {
        let token = capture.acquire();
        Self {
            capture: Rc::clone(capture),
            token,
        }
    }

    pub fn token(&self) -> CaptureToken {
        self.token
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.capture.release(self.token);
    }
}

/// Listener registry for a single window. Tracks which acquisitions are live.
#[derive(Debug, Default)]
pub struct WindowListeners {
    next: Cell<u64>,
    active: RefCell<Vec<CaptureToken>>,
}

impl WindowListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listener sets currently attached to the window.
    pub fn active_count(&self) -> usize {
        self.active.borrow().len()
    }

    pub fn is_active(&self, token: CaptureToken) -> bool {
        self.active.borrow().contains(&token)
    }
}

impl PointerCapture for WindowListeners {
    fn acquire(&self) -> CaptureToken {
        let token = CaptureToken(self.next.get());
        self.next.set(token.0 + 1);
        self.active.borrow_mut().push(token);
        log::debug!("pointer listeners attached ({token:?})");
        token
    }

    fn release(&self, token: CaptureToken) {
        let mut active = self.active.borrow_mut();
        if let Some(pos) = active.iter().position(|t| *t == token) {
            active.remove(pos);
            log::debug!("pointer listeners detached ({token:?})");
        }
    }
}

// ─── Controller ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize,
}

/// State of one active gesture.
struct ActiveGesture {
    target: OverlayRef,
    uid: Uid,
    anchor: (f64, f64),
    initial: PercentRect,
    _guard: CaptureGuard,
}

/// What a plain click on an overlay does.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    /// Presentation mode: follow the overlay's target.
    Navigate(String),
    /// Edit mode: the overlay was picked; published as `overlay-select`.
    Pick(Overlay),
}

pub struct InteractionController {
    capture: Rc<dyn PointerCapture>,
    container: Option<ContainerRect>,
    edit_mode: bool,
    drag: Option<ActiveGesture>,
    resize: Option<ActiveGesture>,
}

impl InteractionController {
    pub fn new(capture: Rc<dyn PointerCapture>) -> Self {
        Self {
            capture,
            container: None,
            edit_mode: false,
            drag: None,
            resize: None,
        }
    }

    /// Pixel size of the canvas container. Moves are ignored until it is set.
    pub fn set_container(&mut self, container: ContainerRect) {
        self.container = Some(container);
    }

    pub fn container(&self) -> Option<ContainerRect> {
        self.container
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// Turning edit mode off ends any gesture in progress.
    pub fn set_edit_mode(&mut self, enabled: bool) {
        if !enabled {
            self.teardown();
        }
        self.edit_mode = enabled;
    }

    pub fn active(&self) -> Option<GestureKind> {
        if self.drag.is_some() {
            Some(GestureKind::Drag)
        } else if self.resize.is_some() {
            Some(GestureKind::Resize)
        } else {
            None
        }
    }

    /// End every active gesture and release its listeners.
    pub fn teardown(&mut self) {
        if self.drag.take().is_some() {
            log::debug!("drag ended");
        }
        if self.resize.take().is_some() {
            log::debug!("resize ended");
        }
    }

    /// Handle a pointer event, returning the mutations to apply.
    ///
    /// `hit` is the overlay under the pointer for pointer-down events.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        hit: Option<HitTarget>,
        store: &SlideStore,
    ) -> Vec<SlideMutation> {
        if event.ends_gesture() {
            self.teardown();
            return vec![];
        }
        let Some(point) = event.position() else {
            return vec![];
        };
        match event {
            InputEvent::PointerDown { .. } => self.begin(point, hit, store),
            _ => self.update(point, store),
        }
    }

    fn begin(
        &mut self,
        point: (f64, f64),
        hit: Option<HitTarget>,
        store: &SlideStore,
    ) -> Vec<SlideMutation> {
        // A pointer-up we never saw leaves a stale gesture behind.
        self.teardown();

        let Some(hit) = hit else {
            return vec![];
        };
        let Some(overlay) = store.overlay(hit.overlay) else {
            log::warn!("pointer-down on unknown overlay {:?}", hit.overlay);
            return vec![];
        };

        if self.edit_mode {
            let gesture = ActiveGesture {
                target: hit.overlay,
                uid: overlay.uid,
                anchor: point,
                initial: overlay.rect(),
                _guard: CaptureGuard::acquire(&self.capture),
            };
            match hit.handle {
                Handle::Body => self.drag = Some(gesture),
                Handle::Resize => self.resize = Some(gesture),
            }
        }
        vec![SlideMutation::SelectOverlay { at: hit.overlay }]
    }

    fn update(&mut self, point: (f64, f64), store: &SlideStore) -> Vec<SlideMutation> {
        let Some(container) = self.container else {
            return vec![];
        };
        let mut mutations = Vec::new();
        if let Some(drag) = follow(&mut self.drag, store) {
            let delta = PointerDelta::between(drag.anchor, point);
            let rect = compute_drag(delta, container, drag.initial);
            mutations.push(geometry_update(drag.target, rect));
        }
        if let Some(resize) = follow(&mut self.resize, store) {
            let delta = PointerDelta::between(resize.anchor, point);
            let rect = compute_resize(delta, container, resize.initial);
            mutations.push(geometry_update(resize.target, rect));
        }
        mutations
    }

    /// Resolve a click on an overlay.
    pub fn click(&self, hit: HitTarget, store: &SlideStore) -> Option<ClickAction> {
        let overlay = store.overlay(hit.overlay)?;
        if self.edit_mode {
            Some(ClickAction::Pick(overlay.clone()))
        } else {
            overlay.target.clone().map(ClickAction::Navigate)
        }
    }
}

/// Re-resolve a gesture's target by uid. Ends the gesture (releasing its
/// listeners) when the overlay no longer exists.
fn follow<'a>(
    slot: &'a mut Option<ActiveGesture>,
    store: &SlideStore,
) -> Option<&'a ActiveGesture> {
    let (target, uid) = slot.as_ref().map(|g| (g.target, g.uid))?;
    if store.overlay(target).map(|o| o.uid) != Some(uid) {
        match store.slide().locate(uid) {
            Some(at) => {
                log::debug!("gesture target {uid} moved to {at:?}");
                if let Some(gesture) = slot.as_mut() {
                    gesture.target = at;
                }
            }
            None => {
                log::debug!("gesture target {uid} removed; gesture ended");
                *slot = None;
            }
        }
    }
    slot.as_ref()
}

fn geometry_update(at: OverlayRef, rect: PercentRect) -> SlideMutation {
    SlideMutation::UpdateOverlay {
        at,
        patch: OverlayPatch::geometry(rect),
    }
}
