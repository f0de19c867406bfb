use thiserror::Error;

/// Errors that stop the loop before it starts. Stage failures are absorbed
/// per iteration and never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoopError {
    #[error("Configuration error: {0}")]
    Config(String),
}
