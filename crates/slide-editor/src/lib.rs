//! Slide overlay editor: the canvas-side store and gestures, the event bus
//! and boundary transport, and the control panel mirror.

pub mod boundary;
pub mod bus;
pub mod canvas;
pub mod gesture;
pub mod input;
pub mod panel;
pub mod protocol;
pub mod store;

pub use boundary::{BoundaryPort, boundary_pair};
pub use bus::{BusEvent, LocalBus, Subscription};
pub use canvas::CanvasHost;
pub use gesture::{
    CaptureGuard, ClickAction, InteractionController, PointerCapture, WindowListeners,
};
pub use input::{Handle, HitTarget, InputEvent};
pub use panel::{ControlPanel, PanelMirror, PanelView, SaveSink};
pub use protocol::{Command, Event, Notification, ProtocolError};
pub use store::{SlideMutation, SlideStore, StoreError};
