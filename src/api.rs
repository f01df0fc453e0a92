//! Client for OpenAI-compatible chat completion endpoints.
//!
//! One request per user turn. In streaming mode the response arrives as
//! server-sent events; fragments are forwarded over a channel as they are
//! read. In non-streaming mode the completed message is delivered as a
//! single fragment, so both paths produce the same concatenated content.

use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::EffectiveConfig;
use crate::message::Message;

/// Request timeout for a non-streaming completion.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Overall timeout for a streaming completion.
const STREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors surfaced by the API client. Never retried here; the caller
/// decides whether to re-issue the request.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Missing or rejected credential.
    Auth(String),
    /// Connection or timeout failure.
    Network(String),
    /// Non-2xx response, with the provider-supplied message when present.
    Api { status: u16, message: String },
    /// Malformed response body.
    Parse(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(msg) => write!(f, "Auth error: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("request timed out".to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {}", err))
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Events delivered while a response is being produced.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A fragment of generated text.
    Token(String),
    /// The response finished successfully.
    Done,
    /// The request failed; fragments already delivered stand.
    Failed(ApiError),
}

/// Wire format of one transcript entry.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.api_name(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: WireError,
}

/// One parsed `data:` frame of the SSE stream.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct SseFrame {
    /// Text fragments carried by this frame, in order.
    pub tokens: Vec<String>,
    /// Whether the stream is finished after this frame.
    pub done: bool,
    /// Provider error embedded in the frame, if any.
    pub error: Option<String>,
}

/// Parse the payload of one SSE `data:` line.
pub(crate) fn parse_sse_data(data: &str) -> Result<SseFrame, ApiError> {
    if data == "[DONE]" {
        return Ok(SseFrame {
            done: true,
            ..SseFrame::default()
        });
    }
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| ApiError::Parse(format!("bad stream chunk: {}", e)))?;
    let mut frame = SseFrame::default();
    if let Some(error) = chunk.error {
        frame.error = Some(error.message);
        return Ok(frame);
    }
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                frame.tokens.push(content);
            }
        }
        if choice.finish_reason.is_some() {
            frame.done = true;
        }
    }
    Ok(frame)
}

/// Client bound to one effective configuration.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    config: EffectiveConfig,
}

impl ChatClient {
    pub fn new(config: EffectiveConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, transcript: Vec<WireMessage>) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: transcript,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: self.config.stream,
        }
    }

    /// Send the transcript and return a receiver of response events.
    ///
    /// The request runs in a spawned task; dropping the receiver cancels it
    /// at the next fragment boundary (the task's channel send fails and it
    /// bails out).
    pub fn send(&self, transcript: Vec<WireMessage>) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(32);

        let Some(api_key) = self.config.api_key.clone() else {
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx
                    .send(StreamEvent::Failed(ApiError::Auth(
                        "no API key found; set OPENAI_API_KEY or API_KEY".to_string(),
                    )))
                    .await;
            });
            return rx;
        };

        let client = self.client.clone();
        let url = self.endpoint();
        let body = self.request_body(transcript);
        let streaming = self.config.stream;

        tokio::spawn(async move {
            let result = if streaming {
                stream_completion(client, url, api_key, body, tx.clone()).await
            } else {
                fetch_completion(client, url, api_key, body, tx.clone()).await
            };
            if let Err(err) = result {
                let _ = tx.send(StreamEvent::Failed(err)).await;
            }
        });

        rx
    }
}

/// Turn a non-2xx response into an `ApiError`, preferring the provider's
/// own error message when the body parses.
async fn response_error(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    if status.as_u16() == 401 || status.as_u16() == 403 {
        ApiError::Auth(message)
    } else {
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Non-streaming request: one JSON body, delivered as a single fragment.
async fn fetch_completion(
    client: Client,
    url: String,
    api_key: String,
    body: ChatRequest,
    tx: mpsc::Sender<StreamEvent>,
) -> Result<(), ApiError> {
    let response = client
        .post(&url)
        .bearer_auth(&api_key)
        .timeout(REQUEST_TIMEOUT)
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(response_error(response).await);
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| ApiError::Parse(format!("bad response body: {}", e)))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| ApiError::Parse("response contained no choices".to_string()))?;

    if tx.send(StreamEvent::Token(content)).await.is_ok() {
        let _ = tx.send(StreamEvent::Done).await;
    }
    Ok(())
}

/// Streaming request: forward SSE fragments as they arrive.
async fn stream_completion(
    client: Client,
    url: String,
    api_key: String,
    body: ChatRequest,
    tx: mpsc::Sender<StreamEvent>,
) -> Result<(), ApiError> {
    let response = client
        .post(&url)
        .bearer_auth(&api_key)
        .timeout(STREAM_TIMEOUT)
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(response_error(response).await);
    }

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(ApiError::from)?;
        buffer.push_str(&String::from_utf8_lossy(&bytes));

        // Process complete lines; a partial line stays buffered for the
        // next network read.
        while let Some(newline) = buffer.find('\n') {
            let line = buffer[..newline].trim().to_string();
            buffer.drain(..=newline);

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            let frame = match parse_sse_data(data) {
                Ok(frame) => frame,
                // Skip unparseable frames rather than killing the stream;
                // providers interleave keep-alive noise.
                Err(_) => continue,
            };
            if let Some(message) = frame.error {
                return Err(ApiError::Api {
                    status: 200,
                    message,
                });
            }
            for token in frame.tokens {
                if tx.send(StreamEvent::Token(token)).await.is_err() {
                    // Receiver dropped: the user cancelled.
                    return Ok(());
                }
            }
            if frame.done {
                let _ = tx.send(StreamEvent::Done).await;
                return Ok(());
            }
        }
    }

    let _ = tx.send(StreamEvent::Done).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EffectiveConfig, ProfileSettings};

    fn test_config(stream: bool) -> EffectiveConfig {
        let mut config =
            EffectiveConfig::resolve(&ProfileSettings::default(), |_| None).unwrap();
        config.stream = stream;
        config.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn parse_done_marker() {
        let frame = parse_sse_data("[DONE]").unwrap();
        assert!(frame.done);
        assert!(frame.tokens.is_empty());
    }

    #[test]
    fn parse_delta_content() {
        let frame =
            parse_sse_data(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).unwrap();
        assert_eq!(frame.tokens, vec!["Hel".to_string()]);
        assert!(!frame.done);
    }

    #[test]
    fn parse_finish_reason_ends_stream() {
        let frame =
            parse_sse_data(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert!(frame.done);
        assert!(frame.tokens.is_empty());
    }

    #[test]
    fn parse_embedded_error() {
        let frame =
            parse_sse_data(r#"{"error":{"message":"model overloaded"}}"#).unwrap();
        assert_eq!(frame.error.as_deref(), Some("model overloaded"));
    }

    #[test]
    fn parse_garbage_is_an_error() {
        assert!(matches!(
            parse_sse_data("not json"),
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn fragments_concatenate_to_full_message() {
        // The streamed fragments of a recorded response must concatenate to
        // the same content a non-streaming request would return.
        let recorded = [
            r#"{"choices":[{"delta":{"content":"The "}}]}"#,
            r#"{"choices":[{"delta":{"content":"quick "}}]}"#,
            r#"{"choices":[{"delta":{"content":"fox."}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ];
        let mut assembled = String::new();
        let mut done = false;
        for data in recorded {
            let frame = parse_sse_data(data).unwrap();
            for token in frame.tokens {
                assembled.push_str(&token);
            }
            done |= frame.done;
        }
        assert!(done);
        assert_eq!(assembled, "The quick fox.");
    }

    #[test]
    fn request_body_carries_settings() {
        let client = ChatClient::new(test_config(true));
        let body = client.request_body(vec![WireMessage {
            role: "user",
            content: "hi".to_string(),
        }]);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["max_tokens"], 1000);
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let mut config = test_config(true);
        config.api_base_url = "https://example.com/v1/".to_string();
        let client = ChatClient::new(config);
        assert_eq!(client.endpoint(), "https://example.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn missing_key_fails_with_auth_error() {
        let mut config = test_config(true);
        config.api_key = None;
        let client = ChatClient::new(config);
        let mut rx = client.send(vec![]);
        match rx.recv().await {
            Some(StreamEvent::Failed(ApiError::Auth(_))) => {}
            other => panic!("expected auth error, got {:?}", other),
        }
    }
}
