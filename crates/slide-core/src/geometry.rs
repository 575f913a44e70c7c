//! Geometry engine: pointer deltas → clamped percentage rectangles.
//!
//! Overlays are positioned in percentage units relative to the canvas
//! bounding box, so the same record renders correctly at any size. All
//! functions here are pure; the gesture state lives in the editor crate.
//!
//! Invariants maintained for every rect these functions return:
//!
//! - `0 ≤ left` and `left + width ≤ 100`
//! - `0 ≤ top` and `top + height ≤ 100`
//! - `width, height ≥ MIN_OVERLAY_SIZE` (resize only; drag keeps the size)

use serde::{Deserialize, Serialize};

/// Full extent of the canvas in percentage units.
pub const FULL_EXTENT: f64 = 100.0;

/// Smallest width/height an overlay may be resized to, so it stays grabbable.
pub const MIN_OVERLAY_SIZE: f64 = 5.0;

/// An overlay rectangle in percentage units `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Pixel size of the canvas bounding box the overlays are laid out in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerRect {
    pub width: f64,
    pub height: f64,
}

/// Pointer movement in pixels since the gesture started.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerDelta {
    pub dx: f64,
    pub dy: f64,
}

impl PercentRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// True when the rect satisfies the bounds and minimum-size invariants.
    pub fn is_within_bounds(&self) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right() <= FULL_EXTENT
            && self.bottom() <= FULL_EXTENT
            && self.width >= MIN_OVERLAY_SIZE
            && self.height >= MIN_OVERLAY_SIZE
    }

    /// Bring an arbitrary rect inside the invariants.
    ///
    /// Size is floored at the minimum and capped at the full extent first,
    /// then the position is clamped so the rect fits. A rect that already
    /// satisfies the invariants is returned unchanged.
    pub fn constrained(&self) -> Self {
        let width = finite_or(self.width, MIN_OVERLAY_SIZE).clamp(MIN_OVERLAY_SIZE, FULL_EXTENT);
        let height = finite_or(self.height, MIN_OVERLAY_SIZE).clamp(MIN_OVERLAY_SIZE, FULL_EXTENT);
        let left = finite_or(self.left, 0.0).clamp(0.0, FULL_EXTENT - width);
        let top = finite_or(self.top, 0.0).clamp(0.0, FULL_EXTENT - height);
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

impl ContainerRect {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A container with zero or non-finite extent cannot map pixels to
    /// percentages.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0)
    }

    /// Convert a pixel delta into a percentage delta `(dx%, dy%)`.
    fn to_percent(self, delta: PointerDelta) -> (f64, f64) {
        (
            delta.dx / self.width * FULL_EXTENT,
            delta.dy / self.height * FULL_EXTENT,
        )
    }
}

impl PointerDelta {
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Delta between two pointer positions.
    pub fn between(from: (f64, f64), to: (f64, f64)) -> Self {
        Self {
            dx: to.0 - from.0,
            dy: to.1 - from.1,
        }
    }
}

// ─── Gestures ────────────────────────────────────────────────────────────

/// Move `initial` by `delta`, keeping the rect fully inside the canvas.
///
/// Width and height are untouched. A degenerate container returns `initial`.
pub fn compute_drag(
    delta: PointerDelta,
    container: ContainerRect,
    initial: PercentRect,
) -> PercentRect {
    if container.is_degenerate() {
        return initial;
    }
    let (dx, dy) = container.to_percent(delta);
    let max_left = (FULL_EXTENT - initial.width).max(0.0);
    let max_top = (FULL_EXTENT - initial.height).max(0.0);

    PercentRect {
        left: clamp_finite(initial.left + dx, 0.0, max_left, initial.left),
        top: clamp_finite(initial.top + dy, 0.0, max_top, initial.top),
        ..initial
    }
}

/// Grow or shrink `initial` by `delta` with the top-left corner anchored.
///
/// The new size is floored at [`MIN_OVERLAY_SIZE`] and then capped so the
/// rect does not cross the right/bottom edge. A degenerate container returns
/// `initial`.
pub fn compute_resize(
    delta: PointerDelta,
    container: ContainerRect,
    initial: PercentRect,
) -> PercentRect {
    if container.is_degenerate() {
        return initial;
    }
    let (dx, dy) = container.to_percent(delta);
    let max_width = FULL_EXTENT - initial.left;
    let max_height = FULL_EXTENT - initial.top;

    PercentRect {
        width: finite_or(
            (initial.width + dx).max(MIN_OVERLAY_SIZE).min(max_width),
            initial.width,
        ),
        height: finite_or(
            (initial.height + dy).max(MIN_OVERLAY_SIZE).min(max_height),
            initial.height,
        ),
        ..initial
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

fn clamp_finite(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    finite_or(value, fallback).clamp(min, max)
}
