//! Incremental SSE (Server-Sent Events) decoder.
//!
//! Handles:
//! - Partial frames across TCP chunks
//! - UTF-8 sequences split between reads (frames are only cut at `\n\n`)
//! - The `[DONE]` sentinel, after which all further input is discarded
//! - A hard cap on buffered, undelimited input

use crate::error::Error;
use bytes::{Buf, BytesMut};
use memchr::memmem;
use serde_json::Value;
use std::collections::VecDeque;

/// Upper bound on bytes held while waiting for a frame delimiter.
pub const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

const FRAME_DELIMITER: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded item.
#[derive(Debug, Clone, PartialEq)]
pub enum SseItem {
    /// A `data:` payload that parsed as JSON.
    Event(Value),
    /// The server sent `[DONE]`.
    Done,
}

/// Frame-based SSE decoder producing JSON payloads.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: BytesMut,
    /// Events from an already-split frame, not yet handed out.
    pending: VecDeque<Value>,
    limit: usize,
    done: bool,
}

impl SseDecoder {
    /// Create a decoder with the default 10 MiB buffer limit.
    pub fn new() -> Self {
        Self::with_limit(MAX_BUFFER_SIZE)
    }

    /// Create a decoder with a custom buffer limit.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            pending: VecDeque::new(),
            limit,
            done: false,
        }
    }

    /// Feed bytes read from the stream.
    ///
    /// Fails with a status-0 API error once the undelimited buffer exceeds
    /// the limit. Input after the sentinel is dropped.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.done {
            return Ok(());
        }
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > self.limit {
            return Err(Error::api(
                0,
                format!(
                    "SSE buffer overflow: {} bytes without a frame delimiter (limit {})",
                    self.buffer.len(),
                    self.limit
                ),
            ));
        }
        Ok(())
    }

    /// Next decoded item, or `None` if more input is needed.
    pub fn next_item(&mut self) -> Option<SseItem> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(SseItem::Event(event));
            }
            if self.done {
                return Some(SseItem::Done);
            }
            let frame = self.take_frame()?;
            self.decode_frame(&frame);
        }
    }

    /// True once the sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Bytes currently waiting for a delimiter.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Split off the first complete frame, consuming its delimiter.
    fn take_frame(&mut self) -> Option<BytesMut> {
        let end = memmem::find(&self.buffer, FRAME_DELIMITER)?;
        let frame = self.buffer.split_to(end);
        self.buffer.advance(FRAME_DELIMITER.len());
        Some(frame)
    }

    fn decode_frame(&mut self, frame: &[u8]) {
        let text = String::from_utf8_lossy(frame);
        for line in text.split('\n') {
            let Some(payload) = line.strip_prefix(DATA_PREFIX).map(str::trim) else {
                continue;
            };
            if payload.is_empty() {
                continue;
            }
            if payload == DONE_SENTINEL {
                self.done = true;
                self.buffer.clear();
                return;
            }
            match serde_json::from_str(payload) {
                Ok(value) => self.pending.push_back(value),
                Err(e) => tracing::trace!(error = %e, "skipping malformed SSE data line"),
            }
        }
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}
