//! Slide writers: where a save request is actually committed.
//!
//! - [`ProcessWriter`] hands the request to the `slide-writer` executable as a
//!   frame on its stdin and waits for the response frame.
//! - [`FsWriter`] writes in-process. It is also what `slide-writer` runs.
//!
//! Both commit atomically: the record is written to a temp file next to the
//! target and renamed over it, so readers never see a half-written slide.

use crate::error::BridgeError;
use crate::frame::{WriteResponse, read_frame, write_frame};
use slide_core::{SaveRequest, encode_slide};
use std::future::Future;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::Command;

/// Commits one save request, returning the number of bytes written.
pub trait SlideWriter: Send + Sync + 'static {
    fn write(
        &self,
        request: &SaveRequest,
    ) -> impl Future<Output = Result<usize, BridgeError>> + Send;
}

// ─── In-process ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a save target against the content root.
    ///
    /// Only plain relative paths are accepted; absolute paths and `..`
    /// components are rejected.
    pub fn resolve(&self, target: &str) -> Result<PathBuf, BridgeError> {
        let relative = Path::new(target);
        let mut normal = relative
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .peekable();
        let plain = normal.peek().is_some() && normal.all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(BridgeError::InvalidTarget(target.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Blocking write: temp file in the target directory, then rename.
    pub fn write_blocking(&self, request: &SaveRequest) -> Result<usize, BridgeError> {
        let path = self.resolve(&request.target)?;
        let json = encode_slide(&request.slide)?;
        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| BridgeError::Io(e.error))?;

        log::debug!("wrote {} ({} bytes)", path.display(), json.len());
        Ok(json.len())
    }
}

impl SlideWriter for FsWriter {
    async fn write(&self, request: &SaveRequest) -> Result<usize, BridgeError> {
        let writer = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || writer.write_blocking(&request))
            .await
            .map_err(|e| BridgeError::Io(std::io::Error::other(e)))?
    }
}

// ─── Out-of-process ──────────────────────────────────────────────────────

/// How long a writer process gets to answer before it is killed.
pub const DEFAULT_WRITER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ProcessWriter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessWriter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_WRITER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl SlideWriter for ProcessWriter {
    /// The whole exchange (spawn, request, response, exit) is bounded by the
    /// writer's timeout. On expiry the child is dropped, which kills it.
    async fn write(&self, request: &SaveRequest) -> Result<usize, BridgeError> {
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("{} timed out after {:?}", self.program, self.timeout);
                Err(BridgeError::Timeout(self.timeout))
            }
        }
    }
}

impl ProcessWriter {
    async fn exchange(&self, request: &SaveRequest) -> Result<usize, BridgeError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(BridgeError::NoResponse);
        };
        write_frame(&mut stdin, request).await?;
        // Close stdin so the writer sees end of input.
        drop(stdin);

        let response: Option<WriteResponse> = read_frame(&mut BufReader::new(stdout)).await?;
        let status = child.wait().await?;

        match response {
            Some(WriteResponse::Ok { bytes }) => Ok(bytes),
            Some(WriteResponse::Error { message }) => Err(BridgeError::Writer(message)),
            None if !status.success() => Err(BridgeError::WriterExit(status)),
            None => Err(BridgeError::NoResponse),
        }
    }
}

// ─── Configured ──────────────────────────────────────────────────────────

/// The writer selected by a [`BridgeConfig`](crate::config::BridgeConfig).
#[derive(Debug, Clone)]
pub enum ConfiguredWriter {
    Process(ProcessWriter),
    Fs(FsWriter),
}

impl SlideWriter for ConfiguredWriter {
    async fn write(&self, request: &SaveRequest) -> Result<usize, BridgeError> {
        match self {
            ConfiguredWriter::Process(writer) => writer.write(request).await,
            ConfiguredWriter::Fs(writer) => writer.write(request).await,
        }
    }
}
