//! Persistence bridge for the slide editor.
//!
//! Takes finalized slides from the control panel and commits them to the
//! content directory through a writer, reporting each outcome back.

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod serve;
pub mod writer;

pub use bridge::{BridgeHandle, PersistenceBridge};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use frame::{WriteResponse, read_frame, write_frame};
pub use serve::serve_one;
pub use writer::{
    ConfiguredWriter, DEFAULT_WRITER_TIMEOUT, FsWriter, ProcessWriter, SlideWriter,
};
