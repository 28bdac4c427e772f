use std::sync::Arc;

use itertools::Itertools;

use crate::compiler::{CompileOutcome, Compiler};
use crate::domain::{
    AdHocOutcome, CaseOutcome, CaseResult, ExecutionLimits, ExecutionOutcome, Problem, Submission,
    TestCase, Verdict,
};
use crate::error::JudgeError;
use crate::sandbox::Sandbox;
use crate::workspace::Workspace;

/// Output comparison ignores leading and trailing whitespace; internal
/// whitespace is significant.
pub fn normalize(output: &str) -> &str {
    output.trim()
}

/// Drives the compiler and the sandbox for one evaluation and folds the
/// per-case outcomes into a [`Verdict`].
#[derive(Clone, Debug)]
pub struct TestHarness {
    compiler: Arc<dyn Compiler>,
    sandbox: Arc<dyn Sandbox>,
    ad_hoc_time_limit_ms: u64,
}

impl TestHarness {
    pub fn new(
        compiler: Arc<dyn Compiler>,
        sandbox: Arc<dyn Sandbox>,
        ad_hoc_time_limit_ms: u64,
    ) -> Self {
        TestHarness {
            compiler,
            sandbox,
            ad_hoc_time_limit_ms,
        }
    }

    /// Compiles the submission once, runs every test case in stored order
    /// against the one artifact, and aggregates the verdict. Compile
    /// rejection short-circuits: no case is executed and the score is 0.
    #[tracing::instrument(skip(self, problem, submission),
        fields(problem = %problem.id, submission = %submission.id, workspace = %workspace.id()))]
    pub async fn evaluate(
        &self,
        problem: &Problem,
        submission: &Submission,
        workspace: &Workspace,
    ) -> Result<Verdict, JudgeError> {
        match self.compiler.compile(&submission.source, workspace).await? {
            CompileOutcome::Rejected { diagnostic } => {
                tracing::info!("submission rejected by toolchain");
                return Ok(Verdict::compile_error(diagnostic));
            }
            CompileOutcome::Compiled => {}
        }

        let binary = workspace.binary_path();
        let mut cases = Vec::with_capacity(problem.test_cases.len());
        for (idx, case) in problem.test_cases.iter().enumerate() {
            let limits = problem.limits_for(case);
            let outcome = self.sandbox.run(&binary, &case.input, &limits).await?;
            cases.push(classify(idx + 1, case, &outcome));
        }

        tracing::debug!(
            outcomes = %cases.iter().map(|c| format!("{:?}", c.outcome)).join(","),
            "finished all test cases"
        );

        let verdict = Verdict::from_cases(cases);
        tracing::info!(score = verdict.score, passed = verdict.passed(), "evaluation complete");
        Ok(verdict)
    }

    /// Compiles once and executes once against caller-supplied input.
    /// No scoring; raw output and diagnostics go back to the author.
    #[tracing::instrument(skip(self, source, input), fields(workspace = %workspace.id()))]
    pub async fn run_ad_hoc(
        &self,
        source: &str,
        input: &str,
        workspace: &Workspace,
    ) -> Result<AdHocOutcome, JudgeError> {
        match self.compiler.compile(source, workspace).await? {
            CompileOutcome::Rejected { diagnostic } => {
                return Ok(AdHocOutcome::CompileRejected { diagnostic });
            }
            CompileOutcome::Compiled => {}
        }

        let limits = ExecutionLimits {
            time_ms: self.ad_hoc_time_limit_ms,
            memory_bytes: None,
        };
        let outcome = self
            .sandbox
            .run(&workspace.binary_path(), input, &limits)
            .await?;
        Ok(AdHocOutcome::Executed(outcome))
    }
}

/// Classification priority: timeout, then nonzero exit, then output
/// comparison. Hidden cases keep their text out of the result.
fn classify(case_number: usize, case: &TestCase, outcome: &ExecutionOutcome) -> CaseResult {
    let classified = if outcome.timed_out {
        CaseOutcome::TimeLimitExceeded
    } else if outcome.exit_code != 0 {
        CaseOutcome::RuntimeError
    } else if normalize(&outcome.stdout) == normalize(&case.expected_output) {
        CaseOutcome::Passed
    } else {
        CaseOutcome::WrongAnswer
    };

    let (actual_output, expected_output) = if case.hidden {
        (None, None)
    } else {
        (
            Some(outcome.stdout.clone()),
            Some(case.expected_output.clone()),
        )
    };

    CaseResult {
        case_number,
        outcome: classified,
        execution_time_ms: outcome.execution_time_ms,
        actual_output,
        expected_output,
    }
}
