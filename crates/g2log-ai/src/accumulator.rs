use tracing::debug;

use crate::content::{DeltaFragment, FragmentKind};
use crate::delta::extract_fragments;
use crate::sse::{SseDecoder, is_done_sentinel};
use crate::stream::{LiveSink, StreamEvent};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Waiting,
    Thinking,
    Answering,
}

/// Turns raw response chunks into live sink events and the final answer text.
///
/// Owns the SSE decoder for one response. Chunks must be pushed in arrival
/// order; `finish` consumes the accumulator and recovers a trailing record.
#[derive(Debug)]
pub struct StreamAccumulator {
    decoder: SseDecoder,
    reasoning_enabled: bool,
    phase: Phase,
    text: String,
    seq: u64,
    skipped: u64,
}

impl StreamAccumulator {
    pub fn new(reasoning_enabled: bool) -> Self {
        Self {
            decoder: SseDecoder::new(),
            reasoning_enabled,
            phase: Phase::Waiting,
            text: String::new(),
            seq: 0,
            skipped: 0,
        }
    }

    /// Decodes `chunk` and forwards every completed fragment to `sink`.
    pub fn push_chunk(&mut self, chunk: &[u8], sink: &mut dyn LiveSink) {
        for body in self.decoder.feed(chunk) {
            self.handle_body(&body, sink);
        }
    }

    /// Handles the record left at end of stream and returns the answer text.
    pub fn finish(mut self, sink: &mut dyn LiveSink) -> String {
        if let Some(body) = self.decoder.flush() {
            self.handle_body(&body, sink);
        }
        debug!(
            content_fragments = self.seq,
            skipped_events = self.skipped,
            chars = self.text.chars().count(),
            "stream finished"
        );
        self.text
    }

    /// Answer text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn handle_body(&mut self, body: &str, sink: &mut dyn LiveSink) {
        if is_done_sentinel(body) {
            return;
        }
        match extract_fragments(body, self.reasoning_enabled) {
            Ok(fragments) => {
                for fragment in fragments {
                    self.apply(fragment, sink);
                }
            }
            Err(reason) => {
                self.skipped += 1;
                debug!(%reason, body, "skipping SSE event");
            }
        }
    }

    fn apply(&mut self, fragment: DeltaFragment, sink: &mut dyn LiveSink) {
        match fragment.kind {
            FragmentKind::ReasoningContent => {
                if self.phase == Phase::Answering {
                    debug!("dropping reasoning fragment received after answer started");
                    return;
                }
                self.phase = Phase::Thinking;
                sink.emit(StreamEvent::Reasoning {
                    text: fragment.text,
                });
            }
            FragmentKind::MainContent => {
                if self.phase == Phase::Thinking {
                    sink.emit(StreamEvent::ThinkingFinished);
                }
                self.phase = Phase::Answering;
                self.text.push_str(&fragment.text);
                sink.emit(StreamEvent::Content {
                    seq: self.seq,
                    text: fragment.text,
                });
                self.seq = self.seq.saturating_add(1);
            }
        }
    }
}
