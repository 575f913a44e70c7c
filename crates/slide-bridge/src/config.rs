//! Bridge configuration.
//!
//! ```toml
//! program = "slide-writer"
//! args = []
//! content_root = "."
//! in_process = false
//! timeout_secs = 30
//! ```

use crate::error::BridgeError;
use crate::writer::{ConfiguredWriter, DEFAULT_WRITER_TIMEOUT, FsWriter, ProcessWriter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Writer executable, looked up on `PATH` when not a path.
    pub program: String,
    /// Extra arguments passed before `--root`.
    pub args: Vec<String>,
    /// Directory save targets are resolved against.
    pub content_root: PathBuf,
    /// Write from this process instead of spawning the writer.
    pub in_process: bool,
    /// Seconds a writer process may take before it is killed.
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: "slide-writer".to_string(),
            args: Vec::new(),
            content_root: PathBuf::from("."),
            in_process: false,
            timeout_secs: DEFAULT_WRITER_TIMEOUT.as_secs(),
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, BridgeError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Build the writer this config describes.
    pub fn writer(&self) -> ConfiguredWriter {
        if self.in_process {
            ConfiguredWriter::Fs(FsWriter::new(&self.content_root))
        } else {
            let mut args = self.args.clone();
            args.push("--root".to_string());
            args.push(self.content_root.display().to_string());
            let timeout = Duration::from_secs(self.timeout_secs);
            let writer = ProcessWriter::new(&self.program, args).with_timeout(timeout);
            ConfiguredWriter::Process(writer)
        }
    }
}
