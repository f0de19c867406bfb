use serde::{Deserialize, Serialize};
use tracing::debug;

/// The literal the judge must answer with for an idea to be accepted
pub const ACCEPT_LITERAL: &str = "valid";
const REJECT_LITERAL: &str = "rejected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected,
}

/// Why a response counted as a rejection. Informational only: both kinds
/// send the loop back to idea generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The judge answered `rejected`
    Explicit,
    /// Anything else, including prose, `VALID` or an empty answer
    Unrecognized,
}

/// The judge's decision on one candidate idea
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionKind>,
    /// The judge's raw answer
    pub rationale: String,
}

impl JudgeVerdict {
    /// Parse the judge's answer.
    ///
    /// Only the exact literal `valid` is an acceptance. Nothing is
    /// normalised, not even surrounding whitespace.
    pub fn parse(judge_output: &str) -> Self {
        debug!(output_len = judge_output.len(), "Parsing judge verdict");

        if judge_output == ACCEPT_LITERAL {
            return Self {
                decision: Decision::Accepted,
                rejection: None,
                rationale: judge_output.to_string(),
            };
        }

        let kind = if judge_output == REJECT_LITERAL {
            RejectionKind::Explicit
        } else {
            RejectionKind::Unrecognized
        };

        Self {
            decision: Decision::Rejected,
            rejection: Some(kind),
            rationale: judge_output.trim().to_string(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.decision == Decision::Accepted
    }

    /// Short description of the verdict for logging
    pub fn short_description(&self) -> String {
        match (self.decision, self.rejection) {
            (Decision::Accepted, _) => "ACCEPTED".to_string(),
            (Decision::Rejected, Some(RejectionKind::Unrecognized)) => {
                "REJECTED (unrecognized answer)".to_string()
            }
            (Decision::Rejected, _) => "REJECTED".to_string(),
        }
    }
}
