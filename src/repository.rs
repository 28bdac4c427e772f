use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::Problem;
use crate::error::JudgeError;

/// External collaborator supplying problems and their test cases. The
/// platform's persistence layer implements this; the judge only reads.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProblemRepository: std::fmt::Debug + Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Problem, JudgeError>;
}

/// Map-backed repository for tests and embedded deployments.
#[derive(Debug, Default)]
pub struct InMemoryProblemRepository {
    problems: DashMap<Uuid, Problem>,
}

impl InMemoryProblemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, problem: Problem) {
        self.problems.insert(problem.id, problem);
    }
}

#[async_trait::async_trait]
impl ProblemRepository for InMemoryProblemRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Problem, JudgeError> {
        self.problems
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(JudgeError::ProblemNotFound(id))
    }
}
