mod executor;
mod idea;
mod prompts;
mod report;
mod role;
mod task;
mod verdict;

pub use executor::{ExecutionError, ExecutorConfig, RoleExecutor, TaskOutput};
pub use idea::{CandidateIdea, IdeaField, IdeaParseError, IdeaRecord, Refinement};
pub use report::{ImplementationReport, ReportSection};
pub use role::{Capability, Role, RoleKind};
pub use task::{Task, TaskKind};
pub use verdict::{Decision, JudgeVerdict, RejectionKind};

pub use tokio_util::sync::CancellationToken;
