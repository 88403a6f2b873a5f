use std::sync::Arc;

use tracing::{debug, info};

use crate::abort::AbortSignal;
use crate::client::{ChatTransport, StreamingClient};
use crate::errors::SummaryError;
use crate::model::{ChatMessage, ClientOptions, ProviderProfile, RequestSpec};
use crate::stream::LiveSink;
use crate::template::{DEFAULT_PROMPT_TEMPLATE, PromptVars, SYSTEM_PROMPT, render_prompt};

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Joins `base_url` and `chat/completions` with exactly one slash.
pub fn build_endpoint(base_url: &str) -> String {
    format!("{}/{CHAT_COMPLETIONS_PATH}", base_url.trim_end_matches('/'))
}

/// What to summarize.
#[derive(Clone, Debug, Default)]
pub struct SummaryInput {
    /// Formatted commit log text.
    pub logs: String,
    /// Author filter; empty means every author.
    pub author: String,
    /// Free-form start of the time range, passed through untouched.
    pub since: String,
    /// Free-form end of the time range, passed through untouched.
    pub until: String,
}

/// Builds summary requests for one provider profile and runs them.
pub struct Summarizer {
    profile: ProviderProfile,
    template: String,
    transport: Arc<dyn ChatTransport>,
    abort: AbortSignal,
}

impl Summarizer {
    /// Creates a summarizer backed by a [`StreamingClient`].
    pub fn new(profile: ProviderProfile, options: ClientOptions) -> Result<Self, SummaryError> {
        let client = StreamingClient::new(options)?;
        Ok(Self::with_transport(profile, Arc::new(client)))
    }

    /// Creates a summarizer over any transport.
    pub fn with_transport(profile: ProviderProfile, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            profile,
            template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            transport,
            abort: AbortSignal::never(),
        }
    }

    /// Replaces the built-in prompt template. Blank templates are ignored.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        let template = template.into();
        if !template.trim().is_empty() {
            self.template = template;
        }
        self
    }

    /// Attaches a cancellation signal used by every request.
    pub fn abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    /// Renders the user prompt for `input`.
    pub fn render_prompt(&self, input: &SummaryInput) -> String {
        render_prompt(
            &self.template,
            &PromptVars {
                logs: &input.logs,
                author: &input.author,
                since: &input.since,
                until: &input.until,
            },
        )
    }

    /// Builds the wire request for `input`.
    pub fn build_request(&self, input: &SummaryInput) -> RequestSpec {
        RequestSpec {
            endpoint: build_endpoint(&self.profile.base_url),
            api_key: self.profile.api_key.clone(),
            model: self.profile.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(self.render_prompt(input)),
            ],
            temperature: self.profile.temperature,
            max_tokens: self.profile.max_tokens,
            reasoning: self.profile.reasoning_enabled(),
        }
    }

    /// Summarizes `input`, echoing fragments to `sink` as they arrive.
    ///
    /// Returns the answer text exactly as streamed. Reasoning text is shown
    /// through the sink only. Failures are not retried.
    pub async fn summarize(
        &self,
        input: &SummaryInput,
        sink: &mut dyn LiveSink,
    ) -> Result<String, SummaryError> {
        let spec = self.build_request(input);
        info!(
            provider = %self.profile.name,
            kind = self.profile.kind.display_name(),
            model = %spec.model,
            prompt_chars = spec.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "requesting work summary"
        );
        let text = self
            .transport
            .stream_chat(&self.profile.name, &spec, sink, self.abort.clone())
            .await?;
        debug!(provider = %self.profile.name, chars = text.chars().count(), "work summary received");
        Ok(text)
    }
}
