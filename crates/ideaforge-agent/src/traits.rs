use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by an LLM provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Missing credential: environment variable {0} not set")]
    MissingCredential(String),
}

impl ProviderError {
    /// Whether a retry of the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } => true,
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::Network(_) => true,
            ProviderError::Timeout(_) => true,
            ProviderError::Auth(_) => false,
            ProviderError::MalformedResponse(_) => false,
            ProviderError::MissingCredential(_) => false,
        }
    }

    /// Delay the provider asked for, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A tool the model may call during an invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// One turn of the conversation sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    User {
        text: String,
    },
    Assistant {
        text: Option<String>,
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        name: String,
        content: serde_json::Value,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User { text: text.into() }
    }
}

/// Everything needed for one model invocation
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// System context (role persona)
    pub system: String,
    pub messages: Vec<Message>,
    /// Tools offered to the model (empty = plain completion)
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
    /// Overrides the client's configured model for this request
    pub model: Option<String>,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: vec![Message::user(instruction)],
            tools: Vec::new(),
            temperature: crate::DEFAULT_TEMPERATURE,
            model: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// The first user message (the task instruction)
    pub fn instruction(&self) -> &str {
        self.messages
            .iter()
            .find_map(|m| match m {
                Message::User { text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or("")
    }
}

/// Response to a single invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls: calls,
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A generative-model endpoint. Stateless: every call carries its full context.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Human-readable provider name (e.g., "Gemini")
    fn name(&self) -> &str;

    /// Model identifier used when a request has no override
    fn model(&self) -> &str;

    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::RateLimited { retry_after: None }.is_retryable());
        assert!(ProviderError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!ProviderError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_retryable());
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ProviderError::Auth("denied".into()).is_retryable());
        assert!(!ProviderError::MissingCredential("GOOGLE_API_KEY".into()).is_retryable());
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        let limited = ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(ProviderError::Network("reset".into()).retry_after(), None);
    }

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("system", "do the thing")
            .with_temperature(0.2)
            .with_model(Some("gemini-1.5-flash".into()));

        assert_eq!(request.instruction(), "do the thing");
        assert!(request.tools.is_empty());
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(request.model.as_deref(), Some("gemini-1.5-flash"));
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::ToolResult {
            name: "search_internet".into(),
            content: serde_json::json!({"results": []}),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "tool_result");
        assert_eq!(json["name"], "search_internet");
    }
}
