use std::sync::Arc;
use std::time::{Duration, Instant};

use ideaforge_agent::{
    LlmClient, LlmRequest, LlmResponse, Message, ProviderError, RetryPolicy, SearchTool,
    DEFAULT_TEMPERATURE,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Capability, Role, RoleKind, Task, TaskKind};

const FINAL_ANSWER_NUDGE: &str =
    "You have used all available tool calls. Give your final answer now without calling tools.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("{role} call failed after {attempts} attempt(s): {source}")]
    Provider {
        role: RoleKind,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("{role} call timed out after {after:?}")]
    Timeout { role: RoleKind, after: Duration },

    #[error("{0} returned an empty response")]
    EmptyResponse(RoleKind),

    #[error("{0} call cancelled")]
    Cancelled(RoleKind),
}

impl ExecutionError {
    /// Whether the failure came from the provider rather than from its output
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            ExecutionError::Provider { .. } | ExecutionError::Timeout { .. }
        )
    }
}

/// Configuration for single-role execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub temperature: f32,
    /// Upper bound for one model invocation
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    /// Tool-call rounds allowed before a final answer is demanded
    pub max_tool_rounds: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            call_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            max_tool_rounds: 5,
        }
    }
}

/// Text produced by one role for one task
#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub text: String,
    pub role: RoleKind,
    pub task: TaskKind,
    pub duration: Duration,
    /// Model invocations including retries and tool rounds
    pub invocations: u32,
    pub tool_calls: usize,
}

impl TaskOutput {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Runs one role against one task
pub struct RoleExecutor {
    llm: Arc<dyn LlmClient>,
    search: Option<Arc<dyn SearchTool>>,
    config: ExecutorConfig,
    cancel: CancellationToken,
}

impl RoleExecutor {
    pub fn new(llm: Arc<dyn LlmClient>, config: ExecutorConfig) -> Self {
        Self {
            llm,
            search: None,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight calls and backoff sleeps when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn with_search(mut self, search: Arc<dyn SearchTool>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    /// Model used when a role has no override
    pub fn default_model(&self) -> &str {
        self.llm.model()
    }

    /// Execute `task` as `role` and return the final answer text.
    ///
    /// Tool calls requested by the model are answered by the search tool and
    /// fed back until the model answers or the tool-round budget runs out.
    /// Cancelling the executor's token aborts the current call or backoff.
    pub async fn execute(&self, role: &Role, task: &Task) -> Result<TaskOutput, ExecutionError> {
        let start = Instant::now();

        let search = self.search.as_ref().filter(|_| role.can(Capability::Search));
        let tools = search.map(|s| s.tool_specs()).unwrap_or_default();

        let mut request = LlmRequest::new(role.system_context(), task.prompt())
            .with_tools(tools)
            .with_temperature(self.config.temperature)
            .with_model(role.model.clone());

        debug!(
            role = %role.kind,
            task = %task.kind,
            tools = request.tools.len(),
            "Executing task"
        );

        let mut invocations = 0;
        let mut tool_rounds = 0;
        let mut tool_calls = 0;

        let text = loop {
            let (response, attempts) = self.invoke_with_retry(role.kind, &request).await?;
            invocations += attempts;

            let search = match search {
                Some(search) if response.wants_tools() && !request.tools.is_empty() => search,
                _ => break response.text.unwrap_or_default(),
            };

            tool_rounds += 1;
            tool_calls += response.tool_calls.len();
            request.messages.push(Message::Assistant {
                text: response.text.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            for call in &response.tool_calls {
                debug!(role = %role.kind, tool = %call.name, "Running tool call");
                let content = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(ExecutionError::Cancelled(role.kind)),
                    content = search.call_tool(&call.name, &call.arguments) => content,
                };
                request.messages.push(Message::ToolResult {
                    name: call.name.clone(),
                    content,
                });
            }

            if tool_rounds >= self.config.max_tool_rounds {
                debug!(role = %role.kind, tool_rounds, "Tool budget exhausted");
                request.tools.clear();
                request.messages.push(Message::user(FINAL_ANSWER_NUDGE));
            }
        };

        if text.trim().is_empty() {
            return Err(ExecutionError::EmptyResponse(role.kind));
        }

        let duration = start.elapsed();
        info!(
            role = %role.kind,
            task = %task.kind,
            invocations,
            tool_calls,
            duration_secs = duration.as_secs_f64(),
            "Task completed"
        );

        Ok(TaskOutput {
            text,
            role: role.kind,
            task: task.kind,
            duration,
            invocations,
            tool_calls,
        })
    }

    /// One invocation under the retry policy. Returns the response and the
    /// number of attempts it took.
    async fn invoke_with_retry(
        &self,
        role: RoleKind,
        request: &LlmRequest,
    ) -> Result<(LlmResponse, u32), ExecutionError> {
        let policy = self.config.retry;
        let mut attempt = 1;

        loop {
            let call = tokio::time::timeout(self.config.call_timeout, self.llm.invoke(request));
            let error = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ExecutionError::Cancelled(role)),
                result = call => match result {
                    Ok(Ok(response)) => return Ok((response, attempt)),
                    Ok(Err(e)) => e,
                    Err(_) => ProviderError::Timeout(self.config.call_timeout),
                },
            };

            if error.is_retryable() && policy.should_retry(attempt) {
                let delay = policy.delay_after(attempt, error.retry_after());
                warn!(
                    role = %role,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Provider call failed, retrying"
                );
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(ExecutionError::Cancelled(role)),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
                continue;
            }

            return Err(match error {
                ProviderError::Timeout(after) => ExecutionError::Timeout { role, after },
                source => ExecutionError::Provider {
                    role,
                    attempts: attempt,
                    source,
                },
            });
        }
    }
}
