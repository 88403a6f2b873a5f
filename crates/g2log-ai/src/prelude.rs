//! Common imports for typical summarizer usage.
pub use crate::{
    AbortHandle, AbortSignal, ClientOptions, LiveSink, ProviderKind, ProviderProfile,
    StreamError, StreamEvent, Summarizer, SummaryError, SummaryInput,
};
