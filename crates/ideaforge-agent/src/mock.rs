//! Scripted clients for tests

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::{LlmClient, LlmRequest, LlmResponse, ProviderError, SearchError, SearchTool, SnippetResult};

type Scripted = Result<LlmResponse, ProviderError>;

struct Rule {
    needle: String,
    responses: Vec<Scripted>,
}

/// An [`LlmClient`] that answers from scripted responses.
///
/// Each rule matches requests whose system context contains a needle (a role
/// name, for instance). A rule's responses are served in order and the last
/// one repeats once the script runs out.
pub struct MockLlmClient {
    rules: Vec<Rule>,
    cursors: Mutex<Vec<usize>>,
    calls: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            cursors: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer requests whose system context contains `needle` with `text`
    pub fn respond(self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.script(needle, vec![Ok(LlmResponse::text(text))])
    }

    /// Serve `responses` in order to matching requests
    pub fn script(mut self, needle: impl Into<String>, responses: Vec<Scripted>) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            responses,
        });
        lock(&self.cursors).push(0);
        self
    }

    /// Every request received so far
    pub fn calls(&self) -> Vec<LlmRequest> {
        lock(&self.calls).clone()
    }

    /// Number of requests whose system context contains `needle`
    pub fn calls_matching(&self, needle: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|r| r.system.contains(needle))
            .count()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "Mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        lock(&self.calls).push(request.clone());

        let Some(index) = self
            .rules
            .iter()
            .position(|r| request.system.contains(&r.needle))
        else {
            return Err(ProviderError::MalformedResponse(
                "no scripted response for request".to_string(),
            ));
        };

        let rule = &self.rules[index];
        let mut cursors = lock(&self.cursors);
        let cursor = cursors[index];
        if cursor + 1 < rule.responses.len() {
            cursors[index] += 1;
        }

        rule.responses
            .get(cursor)
            .cloned()
            .unwrap_or_else(|| Ok(LlmResponse::default()))
    }
}

/// A [`SearchTool`] that returns fixed results and records queries
pub struct MockSearch {
    results: Vec<SnippetResult>,
    failure: Option<SearchError>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(mut self, results: Vec<SnippetResult>) -> Self {
        self.results = results;
        self
    }

    pub fn failing(mut self, error: SearchError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Queries and URLs received so far, in order
    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }

    fn answer(&self, input: &str) -> Result<Vec<SnippetResult>, SearchError> {
        lock(&self.queries).push(input.to_string());
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.results.clone()),
        }
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchTool for MockSearch {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn search(&self, query: &str) -> Result<Vec<SnippetResult>, SearchError> {
        self.answer(query)
    }

    async fn find_similar(&self, url: &str) -> Result<Vec<SnippetResult>, SearchError> {
        self.answer(url)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_repeats_last_response() {
        let client = MockLlmClient::new().script(
            "Judge",
            vec![Ok(LlmResponse::text("rejected")), Ok(LlmResponse::text("valid"))],
        );
        let request = LlmRequest::new("You are Judge", "judge");

        let first = client.invoke(&request).await.unwrap();
        let second = client.invoke(&request).await.unwrap();
        let third = client.invoke(&request).await.unwrap();

        assert_eq!(first.text.as_deref(), Some("rejected"));
        assert_eq!(second.text.as_deref(), Some("valid"));
        assert_eq!(third.text.as_deref(), Some("valid"));
        assert_eq!(client.calls_matching("Judge"), 3);
    }

    #[tokio::test]
    async fn test_unmatched_request_fails() {
        let client = MockLlmClient::new().respond("Creator", "idea");
        let err = client
            .invoke(&LlmRequest::new("You are Writer", "write"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_search_failure() {
        let search = MockSearch::new().failing(SearchError::Request("offline".into()));
        assert!(search.search("anything").await.is_err());
        assert_eq!(search.queries(), vec!["anything".to_string()]);
    }
}
