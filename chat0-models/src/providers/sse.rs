//! Server-sent events line decoding.

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use tracing::trace;

use crate::{Error, Result};

/// Terminator some providers send after the last event.
const DONE: &str = "[DONE]";

/// Incremental decoder turning byte chunks into `data:` payloads.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters and events split across network reads decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every complete `data:` payload.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.accept(&line, &mut out);
        }
        out
    }

    /// Flush a trailing line that had no newline.
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.buf);
        let mut out = Vec::new();
        self.accept(&line, &mut out);
        out
    }

    /// Whether the `[DONE]` terminator was seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn accept(&mut self, line: &[u8], out: &mut Vec<String>) {
        if self.done {
            return;
        }
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);
        if data == DONE {
            self.done = true;
        } else if !data.is_empty() {
            out.push(data.to_string());
        }
    }
}

/// Read a response body as a stream of SSE `data:` payloads.
pub(crate) fn data_events(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::Request(e.to_string()))?;
            for data in decoder.push(&chunk) {
                trace!(data = %data, "sse event");
                yield data;
            }
            if decoder.is_done() {
                break;
            }
        }
        for data in decoder.finish() {
            yield data;
        }
    }
}
