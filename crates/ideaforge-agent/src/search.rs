//! Web search used by roles to ground their answers
//!
//! [`ExaSearch`] talks to the Exa API. The model reaches it through the
//! `search_internet` and `find_similar` tools; the loop never calls it directly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::ToolSpec;

const DEFAULT_BASE_URL: &str = "https://api.exa.ai";
const DEFAULT_API_KEY_ENV: &str = "EXA_API_KEY";
const EXCERPT_MAX_CHARS: usize = 600;

pub const SEARCH_TOOL_NAME: &str = "search_internet";
pub const FIND_SIMILAR_TOOL_NAME: &str = "find_similar";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid search response: {0}")]
    InvalidResponse(String),

    #[error("Missing credential: environment variable {0} not set")]
    MissingCredential(String),
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetResult {
    pub title: String,
    pub url: String,
    pub excerpt: String,
}

/// A search/retrieval backend
#[async_trait]
pub trait SearchTool: Send + Sync {
    fn name(&self) -> &str;

    /// Search for `query`; results are ordered by relevance and may be empty
    async fn search(&self, query: &str) -> Result<Vec<SnippetResult>, SearchError>;

    /// Pages similar to `url`. Backends without this capability return nothing.
    async fn find_similar(&self, _url: &str) -> Result<Vec<SnippetResult>, SearchError> {
        Ok(Vec::new())
    }

    /// Tool specs offered to the model
    fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                SEARCH_TOOL_NAME,
                "Search the internet for up-to-date information about markets, competitors and technologies.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "The search query" }
                    },
                    "required": ["query"]
                }),
            ),
            ToolSpec::new(
                FIND_SIMILAR_TOOL_NAME,
                "Find web pages similar to a given URL, e.g. competitors of a known company.",
                json!({
                    "type": "object",
                    "properties": {
                        "url": { "type": "string", "description": "The URL to find similar pages for" }
                    },
                    "required": ["url"]
                }),
            ),
        ]
    }

    /// Dispatch a tool call by name. Failures are returned as an error payload
    /// for the model rather than as an error.
    async fn call_tool(&self, tool: &str, arguments: &Value) -> Value {
        let result = match tool {
            SEARCH_TOOL_NAME => match arguments["query"].as_str() {
                Some(query) => self.search(query).await,
                None => return json!({ "error": "query is required" }),
            },
            FIND_SIMILAR_TOOL_NAME => match arguments["url"].as_str() {
                Some(url) => self.find_similar(url).await,
                None => return json!({ "error": "url is required" }),
            },
            other => return json!({ "error": format!("Unknown tool: {}", other) }),
        };

        match result {
            Ok(results) if results.is_empty() => json!({ "results": [], "note": "No results found" }),
            Ok(results) => json!({ "results": results }),
            Err(e) => json!({ "error": e.to_string() }),
        }
    }
}

/// Configuration for the Exa client
#[derive(Debug, Clone)]
pub struct ExaConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub num_results: usize,
    pub timeout: Duration,
}

impl Default for ExaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            num_results: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Exa search API client
pub struct ExaSearch {
    client: Client,
    api_key: String,
    config: ExaConfig,
}

impl ExaSearch {
    pub fn from_env(config: ExaConfig) -> Result<Self, SearchError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SearchError::MissingCredential(config.api_key_env.clone()))?;

        Self::with_api_key(api_key, config)
    }

    pub fn with_api_key(api_key: String, config: ExaConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Vec<SnippetResult>, SearchError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        parse_results(&body)
    }

    fn contents_options(&self) -> Value {
        json!({
            "highlights": { "numSentences": 3 },
            "text": { "maxCharacters": EXCERPT_MAX_CHARS }
        })
    }
}

#[async_trait]
impl SearchTool for ExaSearch {
    fn name(&self) -> &str {
        "Exa"
    }

    async fn search(&self, query: &str) -> Result<Vec<SnippetResult>, SearchError> {
        debug!(query, "Exa search");
        let body = json!({
            "query": query,
            "numResults": self.config.num_results,
            "useAutoprompt": true,
            "contents": self.contents_options(),
        });
        self.post("search", body).await
    }

    async fn find_similar(&self, url: &str) -> Result<Vec<SnippetResult>, SearchError> {
        debug!(url, "Exa find similar");
        let body = json!({
            "url": url,
            "numResults": self.config.num_results,
            "contents": self.contents_options(),
        });
        self.post("findSimilar", body).await
    }
}

/// Parse an Exa `results` array into snippets
fn parse_results(body: &Value) -> Result<Vec<SnippetResult>, SearchError> {
    let results = body["results"]
        .as_array()
        .ok_or_else(|| SearchError::InvalidResponse("missing results array".to_string()))?;

    Ok(results
        .iter()
        .map(|r| {
            let highlights: Vec<&str> = r["highlights"]
                .as_array()
                .map(|h| h.iter().filter_map(|s| s.as_str()).collect())
                .unwrap_or_default();
            let excerpt = if highlights.is_empty() {
                truncate(r["text"].as_str().unwrap_or_default(), EXCERPT_MAX_CHARS)
            } else {
                highlights.join(" ... ")
            };

            SnippetResult {
                title: r["title"].as_str().unwrap_or("(no title)").to_string(),
                url: r["url"].as_str().unwrap_or_default().to_string(),
                excerpt,
            }
        })
        .collect())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSearch;

    #[test]
    fn test_parse_results_prefers_highlights() {
        let body = json!({
            "results": [
                {
                    "title": "AI in logistics",
                    "url": "https://example.com/a",
                    "text": "long body",
                    "highlights": ["first point", "second point"]
                },
                {
                    "url": "https://example.com/b",
                    "text": "only text"
                }
            ]
        });

        let results = parse_results(&body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].excerpt, "first point ... second point");
        assert_eq!(results[1].title, "(no title)");
        assert_eq!(results[1].excerpt, "only text");
    }

    #[test]
    fn test_parse_results_missing_array() {
        let err = parse_results(&json!({"error": "bad"})).unwrap_err();
        assert!(matches!(err, SearchError::InvalidResponse(_)));
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_from_env_missing_key() {
        let config = ExaConfig {
            api_key_env: "IDEAFORGE_TEST_EXA_KEY_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ExaSearch::from_env(config),
            Err(SearchError::MissingCredential(_))
        ));
    }

    #[tokio::test]
    async fn test_call_tool_dispatch() {
        let search = MockSearch::new().with_results(vec![SnippetResult {
            title: "Report".into(),
            url: "https://example.com".into(),
            excerpt: "AI adoption grows".into(),
        }]);

        let hit = search
            .call_tool(SEARCH_TOOL_NAME, &json!({"query": "ai adoption"}))
            .await;
        assert_eq!(hit["results"][0]["title"], "Report");

        let missing = search.call_tool(SEARCH_TOOL_NAME, &json!({})).await;
        assert_eq!(missing["error"], "query is required");

        let unknown = search.call_tool("delete_everything", &json!({})).await;
        assert!(unknown["error"].as_str().unwrap().contains("Unknown tool"));

        assert_eq!(search.queries(), vec!["ai adoption".to_string()]);
    }

    #[tokio::test]
    async fn test_call_tool_empty_results() {
        let search = MockSearch::new();
        let value = search
            .call_tool(FIND_SIMILAR_TOOL_NAME, &json!({"url": "https://example.com"}))
            .await;
        assert_eq!(value["results"].as_array().unwrap().len(), 0);
        assert_eq!(value["note"], "No results found");
    }

    #[test]
    fn test_tool_specs() {
        let specs = MockSearch::new().tool_specs();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![SEARCH_TOOL_NAME, FIND_SIMILAR_TOOL_NAME]);
    }
}
