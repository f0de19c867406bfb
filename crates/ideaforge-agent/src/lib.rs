//! Model and search clients for ideaforge.
//!
//! [`LlmClient`] and [`SearchTool`] are the seams the crew runs against;
//! [`GeminiClient`] and [`ExaSearch`] are the HTTP implementations and
//! [`mock`] holds scripted stand-ins for tests.

mod gemini;
pub mod mock;
mod retry;
mod search;
mod traits;

pub use gemini::{GeminiClient, GeminiConfig};
pub use retry::RetryPolicy;
pub use search::{ExaConfig, ExaSearch, SearchError, SearchTool, SnippetResult};
pub use traits::{
    LlmClient, LlmRequest, LlmResponse, Message, ProviderError, ToolCall, ToolSpec,
};

/// Default sampling temperature shared by every role
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
