use serde::{Deserialize, Serialize};

use crate::prompts;

/// The four roles of the idea pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Creator,
    Refiner,
    Judge,
    Writer,
}

impl RoleKind {
    pub const ALL: [RoleKind; 4] = [
        RoleKind::Creator,
        RoleKind::Refiner,
        RoleKind::Judge,
        RoleKind::Writer,
    ];
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleKind::Creator => write!(f, "creator"),
            RoleKind::Refiner => write!(f, "refiner"),
            RoleKind::Judge => write!(f, "judge"),
            RoleKind::Writer => write!(f, "writer"),
        }
    }
}

impl std::str::FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creator" => Ok(RoleKind::Creator),
            "refiner" => Ok(RoleKind::Refiner),
            "judge" => Ok(RoleKind::Judge),
            "writer" | "pitcher" => Ok(RoleKind::Writer),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// What a role is allowed to do during an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    InvokeLlm,
    Search,
}

/// An immutable persona configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub kind: RoleKind,
    pub name: String,
    pub goal: String,
    pub backstory: String,
    pub capabilities: Vec<Capability>,
    /// Model to use instead of the client's default
    pub model: Option<String>,
}

impl Role {
    fn build(kind: RoleKind, name: &str, goal: &str, backstory: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            goal: goal.to_string(),
            backstory: backstory.to_string(),
            capabilities: vec![Capability::InvokeLlm, Capability::Search],
            model: None,
        }
    }

    pub fn creator() -> Self {
        Self::build(
            RoleKind::Creator,
            prompts::CREATOR_NAME,
            prompts::CREATOR_GOAL,
            prompts::CREATOR_BACKSTORY,
        )
    }

    pub fn refiner() -> Self {
        Self::build(
            RoleKind::Refiner,
            prompts::REFINER_NAME,
            prompts::REFINER_GOAL,
            prompts::REFINER_BACKSTORY,
        )
    }

    pub fn judge() -> Self {
        Self::build(
            RoleKind::Judge,
            prompts::JUDGE_NAME,
            prompts::JUDGE_GOAL,
            prompts::JUDGE_BACKSTORY,
        )
    }

    pub fn writer() -> Self {
        Self::build(
            RoleKind::Writer,
            prompts::WRITER_NAME,
            prompts::WRITER_GOAL,
            prompts::WRITER_BACKSTORY,
        )
    }

    pub fn for_kind(kind: RoleKind) -> Self {
        match kind {
            RoleKind::Creator => Self::creator(),
            RoleKind::Refiner => Self::refiner(),
            RoleKind::Judge => Self::judge(),
            RoleKind::Writer => Self::writer(),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn without_search(mut self) -> Self {
        self.capabilities.retain(|c| *c != Capability::Search);
        self
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// System context sent with every invocation of this role
    pub fn system_context(&self) -> String {
        format!(
            "You are {name}.\n{backstory}\n\nYour personal goal is: {goal}",
            name = self.name,
            backstory = self.backstory,
            goal = self.goal,
        )
    }
}
