use std::sync::Arc;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::compiler::{Compiler, GccCompiler};
use crate::config::JudgeConfig;
use crate::domain::{AdHocOutcome, Submission, Verdict};
use crate::error::JudgeError;
use crate::harness::TestHarness;
use crate::repository::ProblemRepository;
use crate::sandbox::{ProcessSandbox, Sandbox};
use crate::workspace::WorkspaceManager;

/// Entry point for the judging pipeline.
///
/// Every invocation runs as an independent task: it takes a concurrency
/// permit, allocates its own workspace, evaluates, and releases the
/// workspace on every path. No mutable state is shared across invocations,
/// so concurrent submissions cannot interfere.
#[derive(Debug)]
pub struct Judge {
    repository: Arc<dyn ProblemRepository>,
    harness: TestHarness,
    workspaces: Arc<WorkspaceManager>,
    permits: Arc<Semaphore>,
}

impl Judge {
    pub fn new(config: &JudgeConfig, repository: Arc<dyn ProblemRepository>) -> Self {
        let compiler: Arc<dyn Compiler> = Arc::new(GccCompiler::new(config));
        let sandbox: Arc<dyn Sandbox> = Arc::new(ProcessSandbox::new());
        Judge::with_parts(
            repository,
            compiler,
            sandbox,
            Arc::new(WorkspaceManager::new(&config.workspace_root)),
            config,
        )
    }

    /// Wires the judge from explicit components; tests use this to swap in
    /// mocks at the seams.
    pub fn with_parts(
        repository: Arc<dyn ProblemRepository>,
        compiler: Arc<dyn Compiler>,
        sandbox: Arc<dyn Sandbox>,
        workspaces: Arc<WorkspaceManager>,
        config: &JudgeConfig,
    ) -> Self {
        Judge {
            repository,
            harness: TestHarness::new(compiler, sandbox, config.time_limit_ms),
            workspaces,
            permits: Arc::new(Semaphore::new(config.max_concurrent_evaluations)),
        }
    }

    /// Graded evaluation of `source` against the referenced problem.
    ///
    /// An unknown problem is terminal (`ProblemNotFound`, not retried).
    /// Internal failures abort the evaluation and surface as errors, never
    /// as a verdict.
    #[tracing::instrument(skip(self, source))]
    pub async fn submit(&self, problem_id: Uuid, source: &str) -> Result<Verdict, JudgeError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| JudgeError::internal("evaluation limiter closed"))?;

        let problem = self.repository.find_by_id(problem_id).await?;
        let submission = Submission::new(problem_id, source);

        let workspace = self.workspaces.allocate().await?;
        let result = self.harness.evaluate(&problem, &submission, &workspace).await;
        self.workspaces.release(workspace).await;
        result
    }

    /// Ungraded run of `source` against caller-supplied input, with the
    /// same workspace lifecycle guarantees as `submit`. Never persisted as
    /// a graded attempt.
    #[tracing::instrument(skip(self, source, input))]
    pub async fn run_ad_hoc(&self, source: &str, input: &str) -> Result<AdHocOutcome, JudgeError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| JudgeError::internal("evaluation limiter closed"))?;

        let workspace = self.workspaces.allocate().await?;
        let result = self.harness.run_ad_hoc(source, input, &workspace).await;
        self.workspaces.release(workspace).await;
        result
    }
}
