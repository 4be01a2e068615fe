//! Lazy SSE event streams and the typed chat completion stream.

use crate::config::TransportConfig;
use crate::dispatch::authorized;
use crate::error::Error;
use crate::sse::{SseDecoder, SseItem};
use crate::types::*;
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use pin_project_lite::pin_project;
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::timeout;
use tracing::debug;

type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// What is needed to open the connection on first pull.
struct PendingRequest {
    http: reqwest::Client,
    config: Arc<TransportConfig>,
    url: String,
    body: Value,
}

enum State {
    Idle(PendingRequest),
    Open {
        body: ByteStream,
        decoder: SseDecoder,
    },
    Closed,
}

/// A single-pass stream of JSON events from an SSE endpoint.
///
/// Constructing it sends nothing. The first [`next`](Self::next) opens the
/// connection, later calls read frames, and the response body is dropped as
/// soon as the stream finishes, fails, or is [released](Self::release).
pub struct EventStream {
    state: State,
}

impl EventStream {
    /// Prepare a streaming POST to `path`. The body's `stream` flag is forced on.
    pub(crate) fn new(
        http: reqwest::Client,
        config: Arc<TransportConfig>,
        path: &str,
        mut body: Value,
    ) -> Self {
        if let Value::Object(fields) = &mut body {
            fields.insert("stream".to_string(), Value::Bool(true));
        }
        let url = config.url(path);

        Self {
            state: State::Idle(PendingRequest {
                http,
                config,
                url,
                body,
            }),
        }
    }

    /// Decode an already-open SSE body.
    pub fn from_byte_stream<S>(bytes: S) -> Self
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self::with_decoder(bytes, SseDecoder::new())
    }

    fn with_decoder<S>(bytes: S, decoder: SseDecoder) -> Self
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self {
            state: State::Open {
                body: bytes.boxed(),
                decoder,
            },
        }
    }

    /// Next event, connecting first if needed.
    ///
    /// Returns `None` after `[DONE]`, at end of data, or once released.
    pub async fn next(&mut self) -> Option<Result<Value, Error>> {
        if matches!(self.state, State::Idle(_)) {
            if let State::Idle(pending) = std::mem::replace(&mut self.state, State::Closed) {
                match connect(pending).await {
                    Ok(response) => {
                        self.state = State::Open {
                            body: response.bytes_stream().boxed(),
                            decoder: SseDecoder::new(),
                        };
                    }
                    Err(e) => return Some(Err(e)),
                }
            }
        }

        loop {
            let State::Open { body, decoder } = &mut self.state else {
                return None;
            };

            let failure = match decoder.next_item() {
                Some(SseItem::Event(value)) => return Some(Ok(value)),
                Some(SseItem::Done) => None,
                None => match body.next().await {
                    Some(Ok(chunk)) => match decoder.feed(&chunk) {
                        Ok(()) => continue,
                        Err(e) => Some(e),
                    },
                    Some(Err(e)) => Some(Error::transport(&e)),
                    None => None,
                },
            };

            self.release();
            return failure.map(Err);
        }
    }

    /// Drop the connection. Safe to call any number of times.
    pub fn release(&mut self) {
        if !matches!(self.state, State::Closed) {
            debug!("releasing event stream");
            self.state = State::Closed;
        }
    }

    /// True once finished, failed, or released.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Consume the handle as a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<Value, Error>> + Send {
        stream::unfold(self, |mut events| async move {
            let item = events.next().await?;
            Some((item, events))
        })
    }
}

/// Send the streaming request under a fresh per-connection timer.
///
/// A non-2xx status surfaces as [`Error::Client`] carrying the status; the
/// status-specific kinds of the dispatcher are not used here.
async fn connect(pending: PendingRequest) -> Result<reqwest::Response, Error> {
    let PendingRequest {
        http,
        config,
        url,
        body,
    } = pending;
    debug!(url = %url, "opening event stream");

    let request = authorized(&http, Method::POST, &url, &config)
        .header(ACCEPT, "text/event-stream")
        .json(&body);

    timeout(config.timeout(), open(request))
        .await
        .map_err(|_| Error::timeout())?
}

async fn open(request: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
    let response = request.send().await.map_err(|e| Error::transport(&e))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(Error::Client {
        message: format!(
            "streaming request failed with status {}: {}",
            status.as_u16(),
            text
        ),
        status: Some(status.as_u16()),
    })
}

/// Running totals of a chat stream.
#[derive(Debug, Default)]
struct Accumulator {
    content: String,
    usage: Usage,
    model: String,
    finish_reason: Option<FinishReason>,
    tool_calls: ToolCallAccumulator,
}

impl Accumulator {
    fn apply(&mut self, chunk: &ChatCompletionChunk) {
        if self.model.is_empty() && !chunk.model.is_empty() {
            self.model.clone_from(&chunk.model);
        }

        if let Some(text) = chunk.text() {
            self.content.push_str(text);
        }

        // Update usage (keep latest/max)
        if let Some(usage) = &chunk.usage {
            self.usage.merge(usage);
        }

        if let Some(reason) = chunk.finish_reason() {
            self.finish_reason = Some(reason);
        }

        for delta in chunk
            .choices
            .first()
            .and_then(|c| c.delta.tool_calls.as_ref())
            .into_iter()
            .flatten()
        {
            self.tool_calls.apply(delta);
        }
    }
}

pin_project! {
    /// A streaming chat completion.
    ///
    /// Yields [`ChatCompletionChunk`]s and accumulates content, usage and
    /// tool calls for [`finalize`](Self::finalize).
    pub struct ChatCompletionStream {
        #[pin]
        inner: BoxStream<'static, Result<Value, Error>>,
        acc: Accumulator,
        done: bool,
    }
}

impl ChatCompletionStream {
    pub fn new(events: EventStream) -> Self {
        Self {
            inner: events.into_stream().boxed(),
            acc: Accumulator::default(),
            done: false,
        }
    }

    /// Get the next chunk from the stream.
    pub async fn next(&mut self) -> Option<Result<ChatCompletionChunk, Error>> {
        StreamExt::next(self).await
    }

    /// Get current accumulated content without finalizing.
    pub fn current_content(&self) -> &str {
        &self.acc.content
    }

    /// Get current accumulated usage without finalizing.
    pub fn current_usage(&self) -> &Usage {
        &self.acc.usage
    }

    /// Check if stream is done.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Finalize the stream and get the accumulated result.
    ///
    /// Fails if the stream has not been drained.
    pub fn finalize(self) -> Result<CompletionResult, Error> {
        if !self.done {
            return Err(Error::client("chat stream finalized before it was drained"));
        }
        let acc = self.acc;

        Ok(CompletionResult {
            content: acc.content,
            usage: acc.usage,
            model: acc.model,
            finish_reason: acc.finish_reason.unwrap_or(FinishReason::Stop),
            tool_calls: acc.tool_calls.finalize(),
        })
    }
}

impl Stream for ChatCompletionStream {
    type Item = Result<ChatCompletionChunk, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(value))) => {
                match serde_json::from_value::<ChatCompletionChunk>(value) {
                    Ok(chunk) => {
                        this.acc.apply(&chunk);
                        Poll::Ready(Some(Ok(chunk)))
                    }
                    Err(e) => Poll::Ready(Some(Err(Error::decode("chat completion chunk", &e)))),
                }
            }
            Poll::Ready(Some(Err(e))) => {
                *this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                *this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
