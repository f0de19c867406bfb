use chrono::{DateTime, Utc};
use ideaforge_crew::{CandidateIdea, ExecutionError, IdeaParseError, JudgeVerdict, RejectionKind};
use ideaforge_logging::Stage;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// State owned by the controller for one run
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// Seed prompt narrowing the idea domain
    pub prompt: String,
    /// Completed iterations (0-indexed number of the current one)
    pub iteration: usize,
    pub max_iterations: usize,
    /// The idea currently in flight, if any
    pub current: Option<CandidateIdea>,
    pub history: Vec<IterationRecord>,
    started_at: Instant,
}

/// How an iteration ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IterationResult {
    Accepted,
    Rejected { unrecognized: bool },
    Unparseable { error: String },
    Failed { error: String, provider: bool },
}

impl IterationResult {
    pub fn label(&self) -> String {
        match self {
            IterationResult::Accepted => "accepted".to_string(),
            IterationResult::Rejected { unrecognized: false } => "rejected".to_string(),
            IterationResult::Rejected { unrecognized: true } => {
                "rejected (unrecognized answer)".to_string()
            }
            IterationResult::Unparseable { .. } => "unparseable idea".to_string(),
            IterationResult::Failed { .. } => "failed".to_string(),
        }
    }
}

/// Summary of a single iteration. Rejected ideas are kept by name only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration_number: usize,
    /// Last stage the iteration reached
    pub stage: Stage,
    pub result: IterationResult,
    pub business_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl IterationRecord {
    fn new(
        iteration_number: usize,
        stage: Stage,
        result: IterationResult,
        business_name: Option<&str>,
    ) -> Self {
        Self {
            iteration_number,
            stage,
            result,
            business_name: business_name.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    pub fn accepted(iteration: usize, business_name: &str) -> Self {
        Self::new(
            iteration,
            Stage::Reporting,
            IterationResult::Accepted,
            Some(business_name),
        )
    }

    pub fn rejected(iteration: usize, verdict: &JudgeVerdict, business_name: &str) -> Self {
        let unrecognized = verdict.rejection == Some(RejectionKind::Unrecognized);
        Self::new(
            iteration,
            Stage::Judging,
            IterationResult::Rejected { unrecognized },
            Some(business_name),
        )
    }

    pub fn unparseable(iteration: usize, error: &IdeaParseError) -> Self {
        Self::new(
            iteration,
            Stage::Generating,
            IterationResult::Unparseable {
                error: error.to_string(),
            },
            None,
        )
    }

    pub fn failed(
        iteration: usize,
        stage: Stage,
        error: &ExecutionError,
        business_name: Option<&str>,
    ) -> Self {
        Self::new(
            iteration,
            stage,
            IterationResult::Failed {
                error: error.to_string(),
                provider: error.is_provider_failure(),
            },
            business_name,
        )
    }

    pub fn is_provider_failure(&self) -> bool {
        matches!(self.result, IterationResult::Failed { provider: true, .. })
    }
}

impl LoopContext {
    pub fn new(prompt: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            prompt: prompt.into(),
            iteration: 0,
            max_iterations,
            current: None,
            history: Vec::new(),
            started_at: Instant::now(),
        }
    }

    pub fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn push_record(&mut self, record: IterationRecord) {
        self.history.push(record);
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn should_continue(&self) -> bool {
        self.iteration < self.max_iterations
    }

    pub fn provider_failures(&self) -> usize {
        self.history
            .iter()
            .filter(|r| r.is_provider_failure())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_continue_respects_max() {
        let mut ctx = LoopContext::new("AI", 2);
        assert!(ctx.should_continue());
        ctx.increment_iteration();
        assert!(ctx.should_continue());
        ctx.increment_iteration();
        assert!(!ctx.should_continue());
    }

    #[test]
    fn test_provider_failures_counted() {
        let mut ctx = LoopContext::new("AI", 3);
        ctx.push_record(IterationRecord::failed(
            0,
            Stage::Generating,
            &ExecutionError::Timeout {
                role: ideaforge_crew::RoleKind::Creator,
                after: Duration::from_secs(1),
            },
            None,
        ));
        ctx.push_record(IterationRecord::failed(
            1,
            Stage::Judging,
            &ExecutionError::EmptyResponse(ideaforge_crew::RoleKind::Judge),
            Some("Orbit"),
        ));
        ctx.push_record(IterationRecord::unparseable(2, &IdeaParseError::Unparseable));

        assert_eq!(ctx.provider_failures(), 1);
        assert_eq!(ctx.history[2].result.label(), "unparseable idea");
        assert_eq!(ctx.history[1].business_name.as_deref(), Some("Orbit"));
    }

    #[test]
    fn test_rejection_records_unrecognized_answer() {
        let record = IterationRecord::rejected(0, &JudgeVerdict::parse("VALID"), "Orbit");
        assert_eq!(record.result, IterationResult::Rejected { unrecognized: true });
        assert_eq!(record.result.label(), "rejected (unrecognized answer)");

        let record = IterationRecord::rejected(0, &JudgeVerdict::parse("rejected"), "Orbit");
        assert_eq!(record.result.label(), "rejected");
    }
}
