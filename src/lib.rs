//! Compile-execute-score pipeline for a C coding-practice platform.
//!
//! A submission is compiled once, executed against every test case of its
//! problem inside a process sandbox, and graded into a [`Verdict`]. Ad hoc
//! runs compile and execute once against caller-supplied input without
//! grading. Problem storage, contest scheduling and transports live outside
//! this crate; they supply a [`ProblemRepository`] and consume the results.

pub mod compiler;
pub mod config;
pub mod domain;
pub mod error;
pub mod harness;
pub mod judge;
pub mod repository;
pub mod sandbox;
pub mod workspace;

pub use compiler::{CompileOutcome, Compiler, GccCompiler};
pub use config::JudgeConfig;
pub use domain::{
    AdHocOutcome, CaseOutcome, CaseResult, ExecutionLimits, ExecutionOutcome, OverallOutcome,
    Problem, Submission, TestCase, Verdict,
};
pub use error::JudgeError;
pub use harness::TestHarness;
pub use judge::Judge;
pub use repository::{InMemoryProblemRepository, ProblemRepository};
pub use sandbox::{ProcessSandbox, Sandbox};
pub use workspace::{Workspace, WorkspaceManager};
