//! Google Gemini client
//!
//! Implements [`LlmClient`] on top of the `generateContent` REST endpoint,
//! including function calling for the search tools.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::{LlmClient, LlmRequest, LlmResponse, Message, ProviderError, ToolCall};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// HTTP timeout for a single request
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a client, reading the API key from `config.api_key_env`
    pub fn from_env(config: GeminiConfig) -> Result<Self, ProviderError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingCredential(config.api_key_env.clone()))?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Build the JSON body for `generateContent`
    fn build_request(&self, request: &LlmRequest) -> Value {
        let mut body = json!({
            "contents": build_contents(&request.messages),
            "generationConfig": {
                "temperature": request.temperature,
            },
        });

        if !request.system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": request.system }] });
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    /// Parse the API response into text and tool calls
    fn parse_response(&self, body: Value) -> Result<LlmResponse, ProviderError> {
        let Some(candidate) = body["candidates"].as_array().and_then(|c| c.first()) else {
            let reason = body["promptFeedback"]["blockReason"]
                .as_str()
                .map(|r| format!("prompt blocked: {}", r))
                .unwrap_or_else(|| "no candidates in response".to_string());
            return Err(ProviderError::MalformedResponse(reason));
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        if let Some(parts) = candidate["content"]["parts"].as_array() {
            for part in parts {
                if let Some(t) = part["text"].as_str() {
                    text.push_str(t);
                } else if let Some(call) = part.get("functionCall") {
                    let name = call["name"].as_str().unwrap_or_default().to_string();
                    if name.is_empty() {
                        return Err(ProviderError::MalformedResponse(
                            "function call without a name".to_string(),
                        ));
                    }
                    let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
                    tool_calls.push(ToolCall::new(name, args));
                }
            }
        }

        if text.is_empty() && tool_calls.is_empty() {
            if let Some(reason) = candidate["finishReason"].as_str() {
                debug!(finish_reason = reason, "Gemini returned an empty candidate");
            }
        }

        Ok(LlmResponse {
            text: (!text.is_empty()).then_some(text),
            tool_calls,
        })
    }

    async fn send_request(&self, model: &str, body: &Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&error_body);
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(ProviderError::Auth(message));
            }
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {}", e)))
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.config.timeout)
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let body = self.build_request(request);

        debug!(
            model,
            tools = request.tools.len(),
            turns = request.messages.len(),
            "Invoking Gemini"
        );

        let response = self.send_request(model, &body).await?;
        self.parse_response(response)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

/// Map conversation turns to Gemini `contents`.
/// Consecutive tool results are grouped into one user turn.
fn build_contents(messages: &[Message]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::new();

    for message in messages {
        match message {
            Message::User { text } => {
                contents.push(json!({ "role": "user", "parts": [{ "text": text }] }));
            }
            Message::Assistant { text, tool_calls } => {
                let mut parts = Vec::new();
                if let Some(text) = text {
                    parts.push(json!({ "text": text }));
                }
                for call in tool_calls {
                    parts.push(json!({
                        "functionCall": { "name": call.name, "args": call.arguments }
                    }));
                }
                contents.push(json!({ "role": "model", "parts": parts }));
            }
            Message::ToolResult { name, content } => {
                let response = if content.is_object() {
                    content.clone()
                } else {
                    json!({ "content": content })
                };
                let part = json!({ "functionResponse": { "name": name, "response": response } });

                let follows_tool_turn = contents.last().is_some_and(|last| {
                    last["parts"]
                        .as_array()
                        .is_some_and(|p| p.iter().all(|p| p.get("functionResponse").is_some()))
                });

                match contents.last_mut().and_then(|last| last["parts"].as_array_mut()) {
                    Some(parts) if follows_tool_turn => parts.push(part),
                    _ => contents.push(json!({ "role": "user", "parts": [part] })),
                }
            }
        }
    }

    contents
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            if body.is_empty() {
                "Unknown error".to_string()
            } else {
                body.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolSpec;

    fn client() -> GeminiClient {
        GeminiClient::with_api_key("test-key".to_string(), GeminiConfig::default()).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_from_env_missing_key() {
        let config = GeminiConfig {
            api_key_env: "IDEAFORGE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        let result = GeminiClient::from_env(config);
        assert!(matches!(
            result,
            Err(ProviderError::MissingCredential(ref var)) if var == "IDEAFORGE_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client = client();
        assert_eq!(
            client.endpoint("gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_build_request_basic() {
        let request = LlmRequest::new("You are a judge", "Judge this");
        let body = client().build_request(&request);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a judge");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Judge this");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_request_with_tools_and_results() {
        let tool = ToolSpec::new(
            "search_internet",
            "Search the web",
            json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        );
        let mut request = LlmRequest::new("sys", "find facts").with_tools(vec![tool]);
        request.messages.push(Message::Assistant {
            text: None,
            tool_calls: vec![
                ToolCall::new("search_internet", json!({"query": "a"})),
                ToolCall::new("search_internet", json!({"query": "b"})),
            ],
        });
        request.messages.push(Message::ToolResult {
            name: "search_internet".into(),
            content: json!({"results": []}),
        });
        request.messages.push(Message::ToolResult {
            name: "search_internet".into(),
            content: json!("plain"),
        });

        let body = client().build_request(&request);

        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "search_internet"
        );
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][1]["parts"][1]["functionCall"]["args"]["query"],
            "b"
        );
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        let tool_parts = contents[2]["parts"].as_array().unwrap();
        assert_eq!(tool_parts.len(), 2);
        assert_eq!(
            tool_parts[1]["functionResponse"]["response"]["content"],
            "plain"
        );
    }

    #[test]
    fn test_parse_response_text() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "val" }, { "text": "id" }] },
                "finishReason": "STOP"
            }]
        });
        let response = client().parse_response(body).unwrap();
        assert_eq!(response.text.as_deref(), Some("valid"));
        assert!(!response.wants_tools());
    }

    #[test]
    fn test_parse_response_function_call() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "functionCall": { "name": "search_internet", "args": { "query": "ai tutors" } } }]
                }
            }]
        });
        let response = client().parse_response(body).unwrap();
        assert!(response.text.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].arguments["query"], "ai tutors");
    }

    #[test]
    fn test_parse_response_empty_candidate() {
        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        let response = client().parse_response(body).unwrap();
        assert_eq!(response, LlmResponse::default());
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = client().parse_response(body).unwrap_err();
        assert_eq!(
            err,
            ProviderError::MalformedResponse("prompt blocked: SAFETY".to_string())
        );
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid"}}"#;
        assert_eq!(extract_error_message(body), "API key not valid");
        assert_eq!(extract_error_message(""), "Unknown error");
        assert_eq!(extract_error_message("gateway down"), "gateway down");
    }
}
