pub mod codec;
pub mod config;
pub mod geometry;
pub mod id;
pub mod lint;
pub mod model;

pub use codec::{SaveOutcome, SaveRequest, SlideError, decode_slide, encode_slide};
pub use config::EditorConfig;
pub use geometry::{ContainerRect, PercentRect, PointerDelta, compute_drag, compute_resize};
pub use id::Uid;
pub use lint::{LintDiagnostic, LintSeverity, lint_slide};
pub use model::*;
