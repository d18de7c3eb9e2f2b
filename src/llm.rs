use crate::config::{Config, GenerationConfig};
use crate::error::ChatError;
use crate::prompts::SystemPrompt;
use serde_json::Value;
use std::future::Future;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Produces one reply for one visitor message.
///
/// Implementations own everything besides the message itself (system prompt,
/// credentials, sampling parameters). Each call is a single, independent
/// round trip: no conversation history is carried between calls.
pub trait TextGenerator: Send + Sync + 'static {
    fn generate(&self, user_message: &str)
    -> impl Future<Output = Result<String, ChatError>> + Send;
}

/// Client for a Gemini-style `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    generation: GenerationConfig,
    prompt: SystemPrompt,
}

impl GeminiClient {
    /// Build a client from configuration.
    ///
    /// In proxy mode no key is attached; otherwise a key must be available.
    pub fn new(config: &Config, prompt: SystemPrompt) -> Result<Self, ChatError> {
        let api_key = if config.endpoint.proxy {
            None
        } else {
            let key = config
                .api_key()
                .ok_or_else(|| ChatError::MissingCredential {
                    env: config.endpoint.api_key_env.clone(),
                })?;
            Some(key)
        };

        // Only the connect phase is bounded; a request otherwise runs to completion.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(ChatError::request)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.url.clone(),
            api_key,
            generation: config.generation,
            prompt,
        })
    }

    pub fn prompt(&self) -> &SystemPrompt {
        &self.prompt
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, user_message: &str) -> Result<String, ChatError> {
        let payload = build_payload(&self.prompt, user_message, &self.generation);

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        debug!(
            endpoint = %self.endpoint,
            proxied = self.api_key.is_none(),
            message_chars = user_message.chars().count(),
            "sending generateContent request"
        );

        let response = request.send().await.map_err(ChatError::request)?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_text, "generateContent request rejected");
            return Err(ChatError::transport(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| {
                ChatError::format(format!("response body is not JSON: {}", e.without_url()))
            })?;

        extract_reply(&body)
    }
}

/// Request body for a single-turn `generateContent` call
pub fn build_payload(
    prompt: &SystemPrompt,
    user_message: &str,
    generation: &GenerationConfig,
) -> Value {
    serde_json::json!({
        "contents": [
            {
                "parts": [
                    { "text": prompt.compose(user_message) }
                ]
            }
        ],
        "generationConfig": {
            "temperature": generation.temperature,
            "maxOutputTokens": generation.max_output_tokens
        }
    })
}

/// Pull `candidates[0].content.parts[0].text` out of a response body
pub fn extract_reply(body: &Value) -> Result<String, ChatError> {
    let content = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|candidate| candidate.get("content"))
        .ok_or_else(|| ChatError::format("missing candidates[0].content"))?;

    content
        .get("parts")
        .and_then(|parts| parts.get(0))
        .and_then(|part| part.get("text"))
        .and_then(|text| text.as_str())
        .map(str::to_string)
        .ok_or_else(|| ChatError::format("missing content.parts[0].text"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const SUCCESS_BODY: &str =
        r#"{"candidates":[{"content":{"parts":[{"text":"He built an online voting platform..."}]}}]}"#;

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    /// Accept one connection, answer it with `status` and `body`, and hand back the raw request.
    async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);

                if let Some(end) = header_end(&buf) {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            String::from_utf8_lossy(&buf).to_string()
        });

        (
            format!("http://{addr}/v1beta/models/test-model:generateContent"),
            handle,
        )
    }

    fn client_for(url: String, proxy: bool) -> GeminiClient {
        let mut config = Config::default();
        config.endpoint.url = url;
        config.endpoint.proxy = proxy;
        config.endpoint.api_key = Some("test-key".to_string());
        GeminiClient::new(&config, SystemPrompt::bundled()).unwrap()
    }

    fn request_body(raw: &str) -> Value {
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_payload_shape() {
        let prompt = SystemPrompt::bundled();
        let payload = build_payload(&prompt, "Hi", &GenerationConfig::default());

        let text = payload["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with(prompt.text()));
        assert!(text.ends_with("\n\nUser: Hi"));
        assert_eq!(payload["generationConfig"]["temperature"], 0.7);
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn test_extract_reply_from_well_formed_body() {
        let body: Value = serde_json::from_str(SUCCESS_BODY).unwrap();
        assert_eq!(
            extract_reply(&body).unwrap(),
            "He built an online voting platform..."
        );
    }

    #[test]
    fn test_extract_reply_rejects_missing_candidates() {
        let body = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(extract_reply(&body), Err(ChatError::Format(_))));
    }

    #[test]
    fn test_extract_reply_rejects_missing_text() {
        let body = serde_json::json!({ "candidates": [ { "content": { "parts": [] } } ] });
        assert!(matches!(extract_reply(&body), Err(ChatError::Format(_))));
    }

    #[test]
    fn test_new_requires_credential_outside_proxy_mode() {
        let mut config = Config::default();
        config.endpoint.api_key = None;
        config.endpoint.api_key_env = "FOLIO_TEST_KEY_THAT_IS_NEVER_SET".to_string();

        let result = GeminiClient::new(&config, SystemPrompt::bundled());
        assert!(matches!(
            result,
            Err(ChatError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_success_round_trip() {
        let (url, server) = serve_once(200, SUCCESS_BODY).await;
        let client = client_for(url, false);

        let reply = client.generate("What projects has he built?").await.unwrap();
        assert_eq!(reply, "He built an online voting platform...");

        let raw = server.await.unwrap();
        let request_line = raw.lines().next().unwrap();
        assert!(request_line.starts_with("POST /v1beta/models/test-model:generateContent?key=test-key"));
        assert!(raw.to_lowercase().contains("content-type: application/json"));

        let body = request_body(&raw);
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with(client.prompt().text()));
        assert!(text.ends_with("\n\nUser: What projects has he built?"));
    }

    #[tokio::test]
    async fn test_generate_maps_server_error_to_transport() {
        let (url, server) = serve_once(500, r#"{"error":"boom"}"#).await;
        let client = client_for(url, false);

        let result = client.generate("Hello").await;
        assert!(matches!(result, Err(ChatError::Transport { status: 500 })));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_maps_unexpected_shape_to_format() {
        let (url, server) = serve_once(200, r#"{"candidates":[]}"#).await;
        let client = client_for(url, false);

        let result = client.generate("Hello").await;
        assert!(matches!(result, Err(ChatError::Format(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_failure_does_not_expose_key() {
        // Bind then drop to get a port nothing is listening on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = Config::default();
        config.endpoint.url = format!("http://{addr}/v1beta/models/test-model:generateContent");
        config.endpoint.api_key = Some("SUPER-SECRET-KEY".to_string());
        let client = GeminiClient::new(&config, SystemPrompt::bundled()).unwrap();

        let err = client.generate("hi").await.unwrap_err();

        assert!(matches!(err, ChatError::Request(_)));
        assert!(!err.to_string().contains("SUPER-SECRET-KEY"));
        assert!(!format!("{err:?}").contains("SUPER-SECRET-KEY"));
    }

    #[tokio::test]
    async fn test_proxy_mode_sends_no_key() {
        let (url, server) = serve_once(200, SUCCESS_BODY).await;
        let client = client_for(url, true);

        client.generate("Hello").await.unwrap();

        let raw = server.await.unwrap();
        assert!(!raw.lines().next().unwrap().contains("key="));
    }
}
