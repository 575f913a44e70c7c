//! Writer side of the frame protocol, as run by `slide-writer`.

use crate::error::BridgeError;
use crate::frame::{WriteResponse, read_frame, write_frame};
use crate::writer::{FsWriter, SlideWriter};
use slide_core::SaveRequest;
use tokio::io::{AsyncBufRead, AsyncWrite};

/// Read one request frame, commit it and answer with one response frame.
///
/// A write failure is reported in the response frame rather than returned;
/// the returned error is for a broken channel (unreadable request, closed
/// output).
pub async fn serve_one<R, W>(
    input: &mut R,
    output: &mut W,
    writer: &FsWriter,
) -> Result<WriteResponse, BridgeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request: SaveRequest = read_frame(input).await?.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no request frame on input")
    })?;
    log::info!("writing {}", request.target);

    let result = writer.write(&request).await;
    if let Err(e) = &result {
        log::error!("failed to write {}: {e}", request.target);
    }
    let response = WriteResponse::from(&result);
    write_frame(output, &response).await?;
    Ok(response)
}
