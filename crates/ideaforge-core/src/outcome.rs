use ideaforge_crew::{CandidateIdea, ImplementationReport};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::IterationRecord;

/// Error text reported when the loop ends without an accepted idea
pub const NO_VIABLE_IDEA: &str = "No viable idea found";

/// The final outcome of a generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// An idea was accepted and written up
    Success {
        iterations: usize,
        idea: CandidateIdea,
        report: ImplementationReport,
        #[serde(skip)]
        history: Vec<IterationRecord>,
        total_duration_secs: f64,
    },
    /// Every iteration ended without an accepted idea
    Exhausted {
        iterations: usize,
        /// Iterations that ended in a provider failure
        provider_failures: usize,
        #[serde(skip)]
        history: Vec<IterationRecord>,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    Interrupted {
        iterations: usize,
        #[serde(skip)]
        history: Vec<IterationRecord>,
        total_duration_secs: f64,
    },
}

impl LoopOutcome {
    pub fn success(
        iterations: usize,
        idea: CandidateIdea,
        report: ImplementationReport,
        history: Vec<IterationRecord>,
        duration: Duration,
    ) -> Self {
        Self::Success {
            iterations,
            idea,
            report,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn exhausted(iterations: usize, history: Vec<IterationRecord>, duration: Duration) -> Self {
        let provider_failures = history.iter().filter(|r| r.is_provider_failure()).count();
        Self::Exhausted {
            iterations,
            provider_failures,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(iterations: usize, history: Vec<IterationRecord>, duration: Duration) -> Self {
        Self::Interrupted {
            iterations,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            Self::Success { iterations, .. } => *iterations,
            Self::Exhausted { iterations, .. } => *iterations,
            Self::Interrupted { iterations, .. } => *iterations,
        }
    }

    pub fn history(&self) -> &[IterationRecord] {
        match self {
            Self::Success { history, .. } => history,
            Self::Exhausted { history, .. } => history,
            Self::Interrupted { history, .. } => history,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// True when every iteration ended in a provider failure
    pub fn provider_failed(&self) -> bool {
        matches!(
            self,
            Self::Exhausted { iterations, provider_failures, .. }
                if *iterations > 0 && provider_failures == iterations
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success { .. } => 0,
            Self::Exhausted { .. } if self.provider_failed() => 2,
            Self::Exhausted { .. } => 1,
            Self::Interrupted { .. } => 130,
        }
    }

    /// The run's result as printed on stdout
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Success { idea, report, .. } => json!({
                "idea": idea,
                "report": report.text,
            }),
            Self::Exhausted { .. } => json!({ "error": NO_VIABLE_IDEA }),
            Self::Interrupted { .. } => json!({ "error": "Interrupted" }),
        }
    }
}
