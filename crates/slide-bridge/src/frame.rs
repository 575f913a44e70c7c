//! Writer wire frames: one JSON document per line.
//!
//! The bridge sends a [`SaveRequest`](slide_core::SaveRequest) frame on the
//! writer's stdin and reads a single [`WriteResponse`] frame from its stdout.

use crate::error::BridgeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum WriteResponse {
    Ok { bytes: usize },
    Error { message: String },
}

impl From<&Result<usize, BridgeError>> for WriteResponse {
    fn from(result: &Result<usize, BridgeError>) -> Self {
        match result {
            Ok(bytes) => WriteResponse::Ok { bytes: *bytes },
            Err(e) => WriteResponse::Error {
                message: e.to_string(),
            },
        }
    }
}

/// Write `value` as one line and flush.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. `None` at end of stream.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, BridgeError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line.trim_end())?))
}
