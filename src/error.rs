use uuid::Uuid;

/// Judge-level failures that abort an evaluation.
///
/// Per-case outcomes (wrong answer, runtime error, time limit, compile
/// rejection) are grading data and live in the [`crate::domain::Verdict`];
/// they are never surfaced through this type.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("problem not found: {0}")]
    ProblemNotFound(Uuid),

    #[error("workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to launch process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("internal judge error: {msg}")]
    Internal { msg: String },
}

impl JudgeError {
    pub fn internal(msg: impl Into<String>) -> Self {
        JudgeError::Internal { msg: msg.into() }
    }
}
