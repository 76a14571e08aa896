//! Server-sent event relay
//!
//! Re-frames the upstream body line by line as `data: <line>\n\n` events.
//! The upstream is opened lazily on first poll, so connection failures are
//! reported in-stream like any other upstream error. The first error ends
//! the stream after a single error event.

use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use uuid::Uuid;

use super::error::UpstreamError;
use super::upstream::{GenerateRequest, Upstream, UpstreamBody};

/// Longest upstream line accepted before the stream is failed
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Frame a payload as a single SSE data event
pub fn data_event(payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(payload.len() + 8);
    frame.put_slice(b"data: ");
    frame.put_slice(payload);
    frame.put_slice(b"\n\n");
    frame.freeze()
}

/// Frame an error message as `data: {"error": "<message>", "type": "error"}\n\n`
pub fn error_event(message: &str) -> Bytes {
    let quoted = serde_json::Value::String(message.to_string()).to_string();
    data_event(format!(r#"{{"error": {quoted}, "type": "error"}}"#).as_bytes())
}

/// Stream adapter that splits upstream bytes into lines and frames each
/// non-empty line as an SSE event
pub struct SseRelayStream<S>
where
    S: Stream<Item = Result<Bytes, UpstreamError>> + Unpin,
{
    inner: Option<S>,
    buffer: BytesMut,
    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,
    pending: VecDeque<Bytes>,
    request_id: Uuid,
    frames_sent: usize,
}

impl<S> SseRelayStream<S>
where
    S: Stream<Item = Result<Bytes, UpstreamError>> + Unpin,
{
    pub fn new(inner: S, request_id: Uuid) -> Self {
        Self {
            inner: Some(inner),
            buffer: BytesMut::new(),
            scanned: 0,
            pending: VecDeque::new(),
            request_id,
            frames_sent: 0,
        }
    }

    fn push_line(&mut self, line: &[u8]) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if !line.is_empty() {
            self.pending.push_back(data_event(line));
        }
    }

    fn drain_complete_lines(&mut self) {
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            let line = self.buffer.split_to(pos + 1);
            self.scanned = 0;
            self.push_line(&line[..pos]);
        }
        self.scanned = self.buffer.len();
    }

    fn finish(&mut self) {
        let rest = self.buffer.split();
        self.scanned = 0;
        self.push_line(&rest);
        self.inner = None;
        tracing::debug!(
            request_id = %self.request_id,
            frames = self.frames_sent + self.pending.len(),
            "Upstream stream completed"
        );
    }

    fn fail(&mut self, error: UpstreamError) {
        tracing::error!(
            request_id = %self.request_id,
            error_type = error.category(),
            error_message = %error,
            "Upstream stream failed"
        );
        // A partial line is never forwarded
        self.buffer.clear();
        self.scanned = 0;
        self.pending.push_back(error_event(error.user_message()));
        self.inner = None;
    }
}

impl<S> Stream for SseRelayStream<S>
where
    S: Stream<Item = Result<Bytes, UpstreamError>> + Unpin,
{
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(frame) = this.pending.pop_front() {
                this.frames_sent += 1;
                return Poll::Ready(Some(Ok(frame)));
            }

            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };

            match Pin::new(inner).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.buffer.extend_from_slice(&chunk);
                    this.drain_complete_lines();
                    if this.buffer.len() > MAX_LINE_BYTES {
                        this.fail(UpstreamError::Unexpected(format!(
                            "line exceeds {MAX_LINE_BYTES} bytes"
                        )));
                    }
                }
                Poll::Ready(Some(Err(e))) => this.fail(e),
                Poll::Ready(None) => this.finish(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<S> Drop for SseRelayStream<S>
where
    S: Stream<Item = Result<Bytes, UpstreamError>> + Unpin,
{
    fn drop(&mut self) {
        if self.inner.is_some() {
            tracing::info!(
                request_id = %self.request_id,
                frames = self.frames_sent,
                "Caller disconnected, closing upstream connection"
            );
        }
    }
}

/// Open the upstream for `request` and relay it as SSE frames.
///
/// Nothing happens until the returned stream is first polled.
pub fn relay_stream(
    upstream: Arc<dyn Upstream>,
    request: GenerateRequest,
    request_id: Uuid,
) -> SseRelayStream<UpstreamBody> {
    let opened = stream::once(async move { upstream.open(&request).await })
        .map(|result| match result {
            Ok(body) => body,
            Err(e) => Box::pin(stream::iter([Err::<Bytes, _>(e)])) as UpstreamBody,
        })
        .flatten();

    let body: UpstreamBody = Box::pin(opened);
    SseRelayStream::new(body, request_id)
}
