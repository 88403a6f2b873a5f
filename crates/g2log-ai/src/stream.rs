/// Events written to a [`LiveSink`] while a response streams in.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Extended-reasoning text.
    Reasoning { text: String },
    /// Emitted once, before the first answer fragment that follows reasoning.
    ThinkingFinished,
    /// Answer text. `seq` counts content fragments from 0.
    Content { seq: u64, text: String },
}

/// Receives incremental output of the active request.
///
/// Presentation (console echo, spinner, silence) is up to the implementor.
pub trait LiveSink: Send {
    fn emit(&mut self, event: StreamEvent);
}

impl<F> LiveSink for F
where
    F: FnMut(StreamEvent) + Send,
{
    fn emit(&mut self, event: StreamEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl LiveSink for NullSink {
    fn emit(&mut self, _event: StreamEvent) {}
}

/// Keeps every event in arrival order.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<StreamEvent>,
}

impl RecordingSink {
    /// Concatenated text of all content events.
    pub fn content_text(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            if let StreamEvent::Content { text, .. } = event {
                out.push_str(text);
            }
        }
        out
    }
}

impl LiveSink for RecordingSink {
    fn emit(&mut self, event: StreamEvent) {
        self.events.push(event);
    }
}
