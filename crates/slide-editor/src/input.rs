//! Input abstraction layer.
//!
//! Normalizes mouse, touch, and pen events from the canvas host into a
//! unified `InputEvent` enum consumed by the interaction controller.

use slide_core::OverlayRef;

/// A normalized input event from any pointing device, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pen contact).
    PointerDown { x: f64, y: f64 },

    /// Pointer moved (mouse move, touch move, pen move).
    PointerMove { x: f64, y: f64 },

    /// Pointer released.
    PointerUp { x: f64, y: f64 },

    /// The platform cancelled the pointer stream (touch interrupted,
    /// capture lost).
    PointerCancel,

    /// The window lost focus; a pointer-up may never arrive.
    FocusLost,
}

/// Which part of an overlay the pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    /// The overlay body. Starts a drag.
    Body,
    /// The bottom-right resize handle. Starts a resize.
    Resize,
}

/// An overlay hit by a pointer event, as reported by the canvas host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTarget {
    pub overlay: OverlayRef,
    pub handle: Handle,
}

impl HitTarget {
    pub const fn body(layer_index: usize, overlay_index: usize) -> Self {
        Self {
            overlay: OverlayRef::new(layer_index, overlay_index),
            handle: Handle::Body,
        }
    }

    pub const fn resize(layer_index: usize, overlay_index: usize) -> Self {
        Self {
            overlay: OverlayRef::new(layer_index, overlay_index),
            handle: Handle::Resize,
        }
    }
}

impl InputEvent {
    /// Extract position if this is a positioned pointer event.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y } | Self::PointerMove { x, y } | Self::PointerUp { x, y } => {
                Some((*x, *y))
            }
            Self::PointerCancel | Self::FocusLost => None,
        }
    }

    /// True for every event that ends an active gesture.
    pub fn ends_gesture(&self) -> bool {
        matches!(
            self,
            Self::PointerUp { .. } | Self::PointerCancel | Self::FocusLost
        )
    }
}
