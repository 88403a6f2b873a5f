use std::fmt::Display;

use futures::{Stream, StreamExt as _};
use tracing::{debug, warn};

use crate::abort::AbortSignal;
use crate::accumulator::StreamAccumulator;
use crate::errors::{StreamError, SummaryError};
use crate::model::{ClientOptions, ProviderId, RequestSpec};
use crate::stream::LiveSink;

/// Sends one streaming chat request and resolves to the accumulated answer.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Streams `spec`, forwarding fragments to `sink` as they decode.
    ///
    /// Resolves exactly once: the full answer text, or the error that ended
    /// the request.
    async fn stream_chat(
        &self,
        provider: &ProviderId,
        spec: &RequestSpec,
        sink: &mut dyn LiveSink,
        abort: AbortSignal,
    ) -> Result<String, StreamError>;
}

/// reqwest-backed [`ChatTransport`]. TLS or plaintext follows the URL scheme.
#[derive(Clone, Debug)]
pub struct StreamingClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl StreamingClient {
    pub fn new(options: ClientOptions) -> Result<Self, SummaryError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SummaryError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, options })
    }
}

#[async_trait::async_trait]
impl ChatTransport for StreamingClient {
    async fn stream_chat(
        &self,
        provider: &ProviderId,
        spec: &RequestSpec,
        sink: &mut dyn LiveSink,
        mut abort: AbortSignal,
    ) -> Result<String, StreamError> {
        if spec.api_key.trim().is_empty() {
            return Err(StreamError::MissingCredential {
                provider: provider.clone(),
            });
        }
        let url = reqwest::Url::parse(&spec.endpoint).map_err(|e| {
            StreamError::config(
                provider.clone(),
                format!("invalid endpoint {}: {e}", spec.endpoint),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StreamError::config(
                provider.clone(),
                format!("unsupported endpoint scheme: {}", url.scheme()),
            ));
        }

        let request_id = uuid::Uuid::new_v4();
        debug!(%request_id, %provider, model = %spec.model, endpoint = %url, reasoning = spec.reasoning, "starting chat completion stream");

        let mut http_req = self
            .http
            .post(url)
            .bearer_auth(&spec.api_key)
            .json(&spec.to_body());
        if let Some(timeout) = self.options.timeout {
            http_req = http_req.timeout(timeout);
        }

        let response = tokio::select! {
            biased;
            _ = abort.aborted() => return Err(cancelled(provider)),
            sent = http_req.send() => sent.map_err(|e| {
                StreamError::network(provider.clone(), format!("request failed: {e}"))
            })?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = abort.aborted() => return Err(cancelled(provider)),
                body = response.text() => body.map_err(|e| {
                    StreamError::network(provider.clone(), format!("failed to read error body: {e}"))
                })?,
            };
            let message = error_message_from_body(&body);
            warn!(%request_id, %provider, status = status.as_u16(), %message, "chat completion request rejected");
            return Err(StreamError::http(provider.clone(), status.as_u16(), message));
        }

        let text = pump_stream(
            provider,
            response.bytes_stream(),
            spec.reasoning,
            sink,
            &mut abort,
        )
        .await?;
        debug!(%request_id, %provider, chars = text.chars().count(), "chat completion stream completed");
        Ok(text)
    }
}

/// Drives `stream` through a [`StreamAccumulator`] until it ends, fails or
/// the caller aborts.
pub(crate) async fn pump_stream<S, B, E>(
    provider: &ProviderId,
    stream: S,
    reasoning: bool,
    sink: &mut dyn LiveSink,
    abort: &mut AbortSignal,
) -> Result<String, StreamError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    futures::pin_mut!(stream);
    let mut acc = StreamAccumulator::new(reasoning);
    loop {
        tokio::select! {
            biased;
            _ = abort.aborted() => return Err(cancelled(provider)),
            next = stream.next() => match next {
                Some(Ok(chunk)) => acc.push_chunk(chunk.as_ref(), sink),
                Some(Err(e)) => {
                    return Err(StreamError::network(
                        provider.clone(),
                        format!("streaming read failed: {e}"),
                    ));
                }
                None => break,
            },
        }
    }
    Ok(acc.finish(sink))
}

fn cancelled(provider: &ProviderId) -> StreamError {
    debug!(%provider, "chat completion stream cancelled");
    StreamError::Cancelled {
        provider: provider.clone(),
    }
}

/// Best human-readable message from an error response body.
///
/// Prefers `error.message`, then a string `error`, then `message`; other JSON
/// is returned compact, and non-JSON text as is.
pub(crate) fn error_message_from_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => structured_message(&value).unwrap_or_else(|| value.to_string()),
        Err(_) => trimmed.to_string(),
    }
}

fn structured_message(value: &serde_json::Value) -> Option<String> {
    let error = value.get("error");
    error
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .or_else(|| error.and_then(|e| e.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::abort::AbortHandle;
    use crate::model::ChatMessage;
    use crate::stream::{RecordingSink, StreamEvent};
    use wiremock::matchers::{any, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider() -> ProviderId {
        ProviderId::new("deepseek")
    }

    fn spec_for(endpoint: impl Into<String>, api_key: &str) -> RequestSpec {
        RequestSpec {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: "deepseek-chat".into(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("logs")],
            temperature: Some(0.5),
            max_tokens: None,
            reasoning: false,
        }
    }

    fn client() -> StreamingClient {
        StreamingClient::new(ClientOptions::default()).expect("client")
    }

    fn sse(parts: &[&str]) -> String {
        let mut out = String::new();
        for part in parts {
            let payload = serde_json::json!({"choices":[{"delta":{"content": part}}]});
            out.push_str(&format!("data: {payload}\n\n"));
        }
        out.push_str("data: [DONE]\n\n");
        out
    }

    #[tokio::test]
    async fn streams_sse_body_into_text_and_sink() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(
                serde_json::json!({"model": "deepseek-chat", "stream": true, "temperature": 0.5}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse(&["Hello", " ", "world"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut sink = RecordingSink::default();
        let text = client()
            .stream_chat(
                &provider(),
                &spec_for(format!("{}/chat/completions", server.uri()), "test-key"),
                &mut sink,
                AbortSignal::never(),
            )
            .await
            .expect("stream ok");
        assert_eq!(text, "Hello world");
        assert_eq!(sink.content_text(), "Hello world");
    }

    #[tokio::test]
    async fn error_status_resolves_to_http_error_with_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "bad key"})),
            )
            .mount(&server)
            .await;

        let mut sink = RecordingSink::default();
        let err = client()
            .stream_chat(
                &provider(),
                &spec_for(format!("{}/chat/completions", server.uri()), "wrong"),
                &mut sink,
                AbortSignal::never(),
            )
            .await
            .expect_err("401");
        match &err {
            StreamError::Http {
                status, message, ..
            } => {
                assert_eq!(*status, 401);
                assert!(message.contains("bad key"));
            }
            other => panic!("expected Http error, got {other:?}"),
        }
        assert!(err.to_string().contains("deepseek"));
    }

    #[tokio::test]
    async fn error_body_is_never_decoded_as_sse() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string(sse(&["leak"])))
            .mount(&server)
            .await;

        let mut sink = RecordingSink::default();
        let err = client()
            .stream_chat(
                &provider(),
                &spec_for(format!("{}/chat/completions", server.uri()), "k"),
                &mut sink,
                AbortSignal::never(),
            )
            .await
            .expect_err("500");
        assert_eq!(err.status(), Some(500));
        assert!(sink.events.is_empty());
    }

    #[tokio::test]
    async fn empty_api_key_fails_without_connecting() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client()
            .stream_chat(
                &provider(),
                &spec_for(format!("{}/chat/completions", server.uri()), "  "),
                &mut RecordingSink::default(),
                AbortSignal::never(),
            )
            .await
            .expect_err("missing key");
        assert_eq!(
            err,
            StreamError::MissingCredential {
                provider: provider()
            }
        );
    }

    #[tokio::test]
    async fn unusable_endpoint_is_a_config_error() {
        for endpoint in ["not a url", "ftp://example.com/chat/completions"] {
            let err = client()
                .stream_chat(
                    &provider(),
                    &spec_for(endpoint, "k"),
                    &mut RecordingSink::default(),
                    AbortSignal::never(),
                )
                .await
                .expect_err("config");
            assert!(matches!(err, StreamError::Config { .. }), "{endpoint}: {err:?}");
        }
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let err = client()
            .stream_chat(
                &provider(),
                &spec_for("http://127.0.0.1:1/chat/completions", "k"),
                &mut RecordingSink::default(),
                AbortSignal::never(),
            )
            .await
            .expect_err("refused");
        assert!(matches!(err, StreamError::Network { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn optional_timeout_surfaces_as_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sse(&["late"]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = StreamingClient::new(ClientOptions::default().timeout(Duration::from_millis(100)))
            .expect("client");
        let err = client
            .stream_chat(
                &provider(),
                &spec_for(format!("{}/chat/completions", server.uri()), "k"),
                &mut RecordingSink::default(),
                AbortSignal::never(),
            )
            .await
            .expect_err("timeout");
        assert!(matches!(err, StreamError::Network { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn abort_while_waiting_for_response_cancels() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sse(&["never shown"]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let (handle, signal) = AbortHandle::pair();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.abort();
        });

        let mut sink = RecordingSink::default();
        let err = client()
            .stream_chat(
                &provider(),
                &spec_for(format!("{}/chat/completions", server.uri()), "k"),
                &mut sink,
                signal,
            )
            .await
            .expect_err("cancelled");
        assert!(matches!(err, StreamError::Cancelled { .. }));
        assert!(sink.events.is_empty());
    }

    #[tokio::test]
    async fn read_error_mid_stream_fails_after_partial_output() {
        let chunks: Vec<Result<&'static [u8], &'static str>> = vec![
            Ok(&b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n"[..]),
            Err("connection reset"),
            Ok(&b"data: {\"choices\":[{\"delta\":{\"content\":\"unseen\"}}]}\n\n"[..]),
        ];
        let mut sink = RecordingSink::default();
        let err = pump_stream(
            &provider(),
            futures::stream::iter(chunks),
            false,
            &mut sink,
            &mut AbortSignal::never(),
        )
        .await
        .expect_err("reset");
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(sink.content_text(), "partial");
    }

    #[tokio::test]
    async fn abort_before_next_chunk_stops_sink_writes() {
        let (handle, mut signal) = AbortHandle::pair();
        handle.abort();
        let chunks: Vec<Result<&'static [u8], &'static str>> =
            vec![Ok(&b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n"[..])];
        let mut sink = RecordingSink::default();
        let err = pump_stream(
            &provider(),
            futures::stream::iter(chunks),
            false,
            &mut sink,
            &mut signal,
        )
        .await
        .expect_err("cancelled");
        assert!(matches!(err, StreamError::Cancelled { .. }));
        assert!(!sink.events.iter().any(|e| matches!(e, StreamEvent::Content { .. })));
    }

    #[test]
    fn error_messages_prefer_structured_fields() {
        assert_eq!(error_message_from_body(r#"{"error":"bad key"}"#), "bad key");
        assert_eq!(
            error_message_from_body(r#"{"error":{"message":"quota exceeded","code":"429"}}"#),
            "quota exceeded"
        );
        assert_eq!(error_message_from_body(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_message_from_body(r#"{"code":7}"#), r#"{"code":7}"#);
        assert_eq!(error_message_from_body("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message_from_body(""), "<empty body>");
    }
}
