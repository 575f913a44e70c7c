//! Lint diagnostics for slide records.
//!
//! Reports structural issues without modifying the slide. Used by the
//! `slide-writer --check` mode and logged by the editor when a slide loads.

use crate::geometry::{FULL_EXTENT, MIN_OVERLAY_SIZE};
use crate::id::Uid;
use crate::model::{OverlayKind, Slide};
use std::collections::HashSet;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Should be fixed; the editor will repair or reject it.
    Warning,
    /// Informational.
    Info,
}

/// A single lint diagnostic for a slide entity.
#[derive(Debug, Clone)]
pub struct LintDiagnostic {
    /// The slide, layer, or overlay this diagnostic refers to.
    pub uid: Uid,
    /// Human-readable message.
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "overlay-bounds", "duplicate-uid").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the slide and return diagnostics.
#[must_use]
pub fn lint_slide(slide: &Slide) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_empty_layers(slide, &mut diags);
    lint_background_level(slide, &mut diags);
    lint_duplicate_uids(slide, &mut diags);
    lint_overlay_geometry(slide, &mut diags);
    lint_hotspot_targets(slide, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Warn when the slide has no editable layer.
fn lint_empty_layers(slide: &Slide, diags: &mut Vec<LintDiagnostic>) {
    if slide.layers.is_empty() {
        diags.push(LintDiagnostic {
            uid: slide.uid,
            message: "Slide has no layers; a default layer will be inserted on load.".into(),
            severity: LintSeverity::Warning,
            rule: "empty-layers",
        });
    }
}

/// Info when an editable layer claims level 0, which belongs to the slide
/// background.
fn lint_background_level(slide: &Slide, diags: &mut Vec<LintDiagnostic>) {
    for layer in &slide.layers {
        if layer.level <= 0 {
            diags.push(LintDiagnostic {
                uid: layer.uid,
                message: format!(
                    "Layer `{}` has level {}; it will render at or below the slide background.",
                    layer.label(),
                    layer.level
                ),
                severity: LintSeverity::Info,
                rule: "background-level",
            });
        }
    }
}

/// Warn when a uid is used by more than one entity.
fn lint_duplicate_uids(slide: &Slide, diags: &mut Vec<LintDiagnostic>) {
    let mut seen = HashSet::new();
    seen.insert(slide.uid);
    let uids = slide
        .layers
        .iter()
        .flat_map(|layer| std::iter::once(layer.uid).chain(layer.overlays.iter().map(|ov| ov.uid)));
    for uid in uids {
        if !seen.insert(uid) {
            diags.push(LintDiagnostic {
                uid,
                message: format!("Duplicate uid `{uid}`; uids must be unique within a slide."),
                severity: LintSeverity::Warning,
                rule: "duplicate-uid",
            });
        }
    }
}

/// Warn when an overlay leaves the canvas or is too small to grab.
fn lint_overlay_geometry(slide: &Slide, diags: &mut Vec<LintDiagnostic>) {
    for overlay in slide.layers.iter().flat_map(|l| &l.overlays) {
        let rect = overlay.rect();
        if rect.left < 0.0
            || rect.top < 0.0
            || rect.right() > FULL_EXTENT
            || rect.bottom() > FULL_EXTENT
        {
            diags.push(LintDiagnostic {
                uid: overlay.uid,
                message: format!(
                    "Overlay `{}` extends outside the canvas (left {}, top {}, width {}, height {}).",
                    overlay.uid, rect.left, rect.top, rect.width, rect.height
                ),
                severity: LintSeverity::Warning,
                rule: "overlay-bounds",
            });
        }
        if rect.width < MIN_OVERLAY_SIZE || rect.height < MIN_OVERLAY_SIZE {
            diags.push(LintDiagnostic {
                uid: overlay.uid,
                message: format!(
                    "Overlay `{}` is smaller than {MIN_OVERLAY_SIZE}%; it cannot be grabbed.",
                    overlay.uid
                ),
                severity: LintSeverity::Warning,
                rule: "overlay-min-size",
            });
        }
    }
}

/// Info when a hotspot has nowhere to go.
fn lint_hotspot_targets(slide: &Slide, diags: &mut Vec<LintDiagnostic>) {
    for overlay in slide.layers.iter().flat_map(|l| &l.overlays) {
        let has_target = overlay.target.as_deref().is_some_and(|t| !t.is_empty());
        if overlay.kind == OverlayKind::Hotspot && !has_target {
            diags.push(LintDiagnostic {
                uid: overlay.uid,
                message: format!("Hotspot `{}` has no target.", overlay.uid),
                severity: LintSeverity::Info,
                rule: "hotspot-target",
            });
        }
    }
}
