//! Adapts [`chatcore::ChunkWriter`] onto an axum streaming HTTP response body.
//!
//! The ToolLoop task pushes fully-framed chunks into a bounded channel; the
//! channel IS the backpressure primitive §5 asks for (a slow consumer blocks the
//! `send`), and a closed receiver (client gone) turns the next `write_line` into
//! an `io::Error`, which `ToolLoop` already treats as "continue in background".

use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::Response;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use chatcore::ChunkWriter;

/// SSE chunks rarely exceed a few KB; a small bound is enough to smooth out
/// provider-delta bursts without letting a stalled client buffer unbounded memory.
const CHANNEL_CAPACITY: usize = 32;

pub struct SseChunkWriter {
    tx: mpsc::Sender<Bytes>,
}

#[async_trait::async_trait]
impl ChunkWriter for SseChunkWriter {
    async fn write_line(&mut self, line: String) -> std::io::Result<()> {
        self.tx
            .send(Bytes::from(line))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "client disconnected"))
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Builds the paired `(SseChunkWriter, Response)`: the writer is handed to the
/// `ToolLoop`'s task, the response is returned to axum immediately so headers go
/// out before the first chunk is produced.
pub fn channel() -> (SseChunkWriter, Response) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let stream = ReceiverStream::new(rx).map(Ok::<_, std::io::Error>);
    let body = Body::from_stream(stream);
    let response = Response::builder()
        .status(200)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(body)
        .expect("static SSE response headers are always valid");
    (SseChunkWriter { tx }, response)
}
