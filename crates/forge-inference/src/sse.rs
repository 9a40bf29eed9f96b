//! Server-sent events decoding shared by every chat backend.
//!
//! Network chunks do not line up with SSE events: an event may span several
//! chunks and one chunk may hold several events. [`SseDecoder`] buffers bytes
//! until a blank line closes an event, so multi-byte UTF-8 sequences split
//! across chunks survive intact.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use forge_core::Result;

/// Raw upstream body, forwarded as-is in passthrough mode.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Stream of text deltas.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One decoded event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// What a backend makes of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseSignal {
    Text(String),
    Skip,
    Done,
}

/// Incremental SSE parser.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = parse_block(&block[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush an unterminated trailing event at end of stream.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let block = std::mem::take(&mut self.buffer);
        parse_block(&block)
    }
}

fn parse_block(block: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(block);
    let mut event = SseEvent::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => event.event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if data_lines.is_empty() && event.event.is_none() {
        return None;
    }
    event.data = data_lines.join("\n");
    Some(event)
}

/// Extracts text from a decoded event.
pub type DeltaExtractor = fn(&SseEvent) -> Result<SseSignal>;

struct DeltaState {
    raw: ByteStream,
    decoder: SseDecoder,
    extract: DeltaExtractor,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl DeltaState {
    fn handle(&mut self, events: Vec<SseEvent>) {
        for event in events {
            if self.finished {
                return;
            }
            match (self.extract)(&event) {
                Ok(SseSignal::Text(text)) if !text.is_empty() => self.pending.push_back(Ok(text)),
                Ok(SseSignal::Text(_)) | Ok(SseSignal::Skip) => {}
                Ok(SseSignal::Done) => self.finished = true,
                Err(e) => {
                    self.pending.push_back(Err(e));
                    self.finished = true;
                }
            }
        }
    }
}

/// Turn a raw SSE body into text deltas using a provider-specific extractor.
///
/// The stream ends at the first `Done` signal, the first error, or the end
/// of the body, whichever comes first.
pub fn text_deltas(raw: ByteStream, extract: DeltaExtractor) -> TokenStream {
    let state = DeltaState {
        raw,
        decoder: SseDecoder::new(),
        extract,
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.raw.next().await {
                Some(Ok(bytes)) => {
                    let events = st.decoder.push(&bytes);
                    st.handle(events);
                }
                Some(Err(e)) => {
                    st.pending.push_back(Err(e));
                    st.finished = true;
                }
                None => {
                    let tail = st.decoder.finish().into_iter().collect();
                    st.handle(tail);
                    st.finished = true;
                }
            }
        }
    });

    Box::pin(stream)
}
