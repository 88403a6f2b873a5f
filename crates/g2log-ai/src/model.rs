use std::fmt;
use std::time::Duration;

/// Stable identifier for a provider profile (for example `deepseek`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Creates a provider id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the provider id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// The closed set of upstream wire variants.
///
/// All three speak the OpenAI chat-completions protocol. Only `Zhipu` accepts
/// the `thinking` request field and streams `reasoning_content` deltas.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    Zhipu,
}

impl ProviderKind {
    /// Maps a profile name to its wire variant.
    ///
    /// Unknown names use the DeepSeek variant.
    pub fn from_profile_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "zhipu" | "bigmodel" => Self::Zhipu,
            _ => Self::DeepSeek,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4",
            Self::DeepSeek => "deepseek-chat",
            Self::Zhipu => "glm-4",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::DeepSeek => "https://api.deepseek.com",
            Self::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
        }
    }

    /// Human-readable vendor name used in console output.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::DeepSeek => "DeepSeek",
            Self::Zhipu => "Zhipu AI",
        }
    }

    /// Whether this variant understands extended reasoning.
    pub fn supports_reasoning(self) -> bool {
        matches!(self, Self::Zhipu)
    }
}

/// Named bundle of credentials and sampling parameters for one upstream API.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderProfile {
    /// Profile name, also used as the provider id in errors and logs.
    pub name: ProviderId,
    /// Wire variant used for request building and delta extraction.
    pub kind: ProviderKind,
    /// Bearer token. May be empty; the client rejects empty keys.
    pub api_key: String,
    /// Base URL; `chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Request extended reasoning (honored only by reasoning-capable kinds).
    pub enable_thinking: bool,
}

impl ProviderProfile {
    /// Creates a profile with the kind's default model and base URL.
    ///
    /// The kind is derived from the name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = ProviderKind::from_profile_name(&name);
        Self {
            name: ProviderId::new(name),
            kind,
            api_key: String::new(),
            base_url: kind.default_base_url().to_string(),
            model: kind.default_model().to_string(),
            temperature: None,
            max_tokens: None,
            enable_thinking: false,
        }
    }

    /// Overrides the wire variant.
    pub fn kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Overrides the base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn enable_thinking(mut self, enabled: bool) -> Self {
        self.enable_thinking = enabled;
        self
    }

    /// True when reasoning is both requested and supported by the kind.
    pub fn reasoning_enabled(&self) -> bool {
        self.enable_thinking && self.kind.supports_reasoning()
    }
}

/// Chat message role.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One chat turn.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A fully built streaming chat request. Always sent with `stream: true`.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Adds `thinking: {type: "enabled"}` and turns on reasoning extraction.
    pub reasoning: bool,
}

impl RequestSpec {
    /// Serializes the JSON request body.
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": self.messages,
            "stream": true,
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if self.reasoning {
            body["thinking"] = serde_json::json!({ "type": "enabled" });
        }
        body
    }
}

/// Transport options shared by all requests of a client.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    /// Whole-request deadline. `None` waits as long as the server keeps streaming.
    pub timeout: Option<Duration>,
}

impl ClientOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
