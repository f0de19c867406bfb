use serde::{Deserialize, Serialize};

use crate::prompts;
use crate::{CandidateIdea, IdeaRecord, Role, RoleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    CreateIdea,
    RefineIdea,
    JudgeIdea,
    WriteReport,
}

impl TaskKind {
    /// The role a task of this kind is written for
    pub fn role_kind(&self) -> RoleKind {
        match self {
            TaskKind::CreateIdea => RoleKind::Creator,
            TaskKind::RefineIdea => RoleKind::Refiner,
            TaskKind::JudgeIdea => RoleKind::Judge,
            TaskKind::WriteReport => RoleKind::Writer,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::CreateIdea => write!(f, "create idea"),
            TaskKind::RefineIdea => write!(f, "refine idea"),
            TaskKind::JudgeIdea => write!(f, "judge idea"),
            TaskKind::WriteReport => write!(f, "write report"),
        }
    }
}

/// An instruction bound to a role for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub role: RoleKind,
    pub instruction: String,
    pub expected_output: String,
}

impl Task {
    /// Ask for a brand new idea. `seed_prompt` narrows the domain.
    pub fn create_idea(role: &Role, seed_prompt: &str) -> Self {
        let mut instruction = prompts::CREATE_INSTRUCTION.to_string();
        let seed = seed_prompt.trim();
        if !seed.is_empty() {
            instruction.push_str("\n\nFocus: ");
            instruction.push_str(seed);
        }

        Self {
            kind: TaskKind::CreateIdea,
            role: role.kind,
            instruction,
            expected_output: format!(
                "{}\n\nStructure:\n\n{}",
                prompts::CREATE_EXPECTED,
                prompts::IDEA_STRUCTURE
            ),
        }
    }

    /// Refine an idea; the idea text is interpolated verbatim
    pub fn refine_idea(role: &Role, idea: &IdeaRecord) -> Self {
        Self {
            kind: TaskKind::RefineIdea,
            role: role.kind,
            instruction: format!("Idea:\n{}\n\n{}", idea.render(), prompts::REFINE_INSTRUCTION),
            expected_output: format!(
                "{}\n\n{}",
                prompts::REFINE_EXPECTED,
                prompts::IDEA_STRUCTURE
            ),
        }
    }

    /// Judge the refined idea, which is passed explicitly
    pub fn judge_idea(role: &Role, idea: &CandidateIdea) -> Self {
        Self {
            kind: TaskKind::JudgeIdea,
            role: role.kind,
            instruction: format!("Idea:\n{}\n\n{}", idea.render(), prompts::JUDGE_INSTRUCTION),
            expected_output: prompts::JUDGE_EXPECTED.to_string(),
        }
    }

    /// Write the implementation report for an approved idea
    pub fn write_report(role: &Role, idea: &CandidateIdea) -> Self {
        Self {
            kind: TaskKind::WriteReport,
            role: role.kind,
            instruction: format!("{}\n\nIdea:\n{}", prompts::REPORT_INSTRUCTION, idea.render()),
            expected_output: prompts::REPORT_EXPECTED.to_string(),
        }
    }

    /// The user message sent to the model
    pub fn prompt(&self) -> String {
        format!(
            "{}\n\nThis is the expected criteria for your final answer:\n{}\n\nYou MUST return the actual complete content as the final answer, not a summary.",
            self.instruction, self.expected_output
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea() -> IdeaRecord {
        IdeaRecord {
            business_name: "QueueLess".into(),
            problem: "Clinics overbook".into(),
            solution: "AI scheduling".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_factories_are_idempotent() {
        let creator = Role::creator();
        assert_eq!(
            Task::create_idea(&creator, "AI ideas"),
            Task::create_idea(&creator, "AI ideas")
        );
        let refiner = Role::refiner();
        assert_eq!(
            Task::refine_idea(&refiner, &idea()),
            Task::refine_idea(&refiner, &idea())
        );
    }

    #[test]
    fn test_create_idea_includes_seed_and_structure() {
        let task = Task::create_idea(&Role::creator(), "  healthcare  ");
        assert_eq!(task.kind, TaskKind::CreateIdea);
        assert_eq!(task.role, RoleKind::Creator);
        assert!(task.instruction.ends_with("Focus: healthcare"));
        assert!(task.expected_output.contains("Business Name: ..."));
        assert!(task.expected_output.contains("Value Proposition: ..."));

        let unseeded = Task::create_idea(&Role::creator(), "");
        assert!(!unseeded.instruction.contains("Focus:"));
    }

    #[test]
    fn test_content_is_interpolated_verbatim() {
        let record = idea();
        let candidate = CandidateIdea {
            record: record.clone(),
            notes: Some("Partner with insurers".into()),
        };

        let refine = Task::refine_idea(&Role::refiner(), &record);
        assert!(refine.instruction.contains(&record.render()));

        let judge = Task::judge_idea(&Role::judge(), &candidate);
        assert!(judge.instruction.contains(&candidate.render()));
        assert!(judge.expected_output.contains("'valid'"));

        let report = Task::write_report(&Role::writer(), &candidate);
        assert!(report.instruction.ends_with(&candidate.render()));
        assert!(report.expected_output.contains("10. **Conclusion:**"));
    }

    #[test]
    fn test_task_kind_role_mapping() {
        assert_eq!(TaskKind::JudgeIdea.role_kind(), RoleKind::Judge);
        assert_eq!(TaskKind::WriteReport.role_kind(), RoleKind::Writer);
    }

    #[test]
    fn test_prompt_combines_instruction_and_expected_output() {
        let task = Task::judge_idea(&Role::judge(), &CandidateIdea::from(idea()));
        let prompt = task.prompt();
        assert!(prompt.starts_with("Idea:\nBusiness Name: QueueLess"));
        assert!(prompt.contains("expected criteria for your final answer"));
    }
}
