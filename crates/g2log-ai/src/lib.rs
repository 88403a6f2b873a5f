//! Streaming chat-completion client and work-summary orchestrator.
//!
//! Commit log text goes in, a summary comes out. Requests target any
//! OpenAI-compatible `chat/completions` endpoint with `stream: true`; the
//! response is decoded as Server-Sent Events and echoed to a [`LiveSink`]
//! while it arrives.
//!
//! # Usage
//!
//! ```no_run
//! use g2log_ai::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SummaryError> {
//! let profile = ProviderProfile::named("deepseek").api_key("sk-...");
//! let summarizer = Summarizer::new(profile, ClientOptions::default())?;
//!
//! let input = SummaryInput {
//!     logs: "api | 2024-03-01 10:00:00 | add login".into(),
//!     author: "alice".into(),
//!     since: "2024-03-01".into(),
//!     until: "2024-03-02".into(),
//! };
//! let text = summarizer
//!     .summarize(&input, &mut |event: StreamEvent| {
//!         if let StreamEvent::Content { text, .. } = event {
//!             print!("{text}");
//!         }
//!     })
//!     .await?;
//! println!("\n{} chars", text.len());
//! # Ok(())
//! # }
//! ```

/// Cancellation of in-flight requests.
pub mod abort;
/// Phase tracking and answer accumulation for one response.
pub mod accumulator;
/// HTTP transport.
pub mod client;
pub mod content;
/// Delta extraction from decoded event bodies.
pub mod delta;
/// Public error types.
pub mod errors;
/// Provider profiles and request descriptions.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// Incremental Server-Sent Events decoding.
pub mod sse;
/// Live output events and sinks.
pub mod stream;
/// Prompt building and the summary entry point.
pub mod summary;
pub mod template;

pub use abort::{AbortHandle, AbortSignal};
pub use accumulator::StreamAccumulator;
pub use client::{ChatTransport, StreamingClient};
pub use content::{DeltaFragment, FragmentKind};
pub use delta::extract_fragments;
pub use errors::{SkippedEvent, StreamError, SummaryError};
pub use model::{
    ChatMessage, ClientOptions, ProviderId, ProviderKind, ProviderProfile, RequestSpec, Role,
};
pub use sse::SseDecoder;
pub use stream::{LiveSink, NullSink, RecordingSink, StreamEvent};
pub use summary::{Summarizer, SummaryInput, build_endpoint};
pub use template::{ALL_AUTHORS, DEFAULT_PROMPT_TEMPLATE, PromptVars, render_prompt};
