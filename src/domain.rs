use uuid::Uuid;

/// A graded problem: ordered test cases plus the default resource limits
/// cases inherit when they don't carry their own.
#[derive(Clone, Debug)]
pub struct Problem {
    pub id: Uuid,
    pub time_limit_ms: u64,
    pub memory_limit_bytes: Option<u64>,
    pub test_cases: Vec<TestCase>,
}

impl Problem {
    /// Effective limits for one test case, falling back to the problem
    /// defaults where the case is silent.
    pub fn limits_for(&self, case: &TestCase) -> ExecutionLimits {
        ExecutionLimits {
            time_ms: case.time_limit_ms.unwrap_or(self.time_limit_ms),
            memory_bytes: case.memory_limit_bytes.or(self.memory_limit_bytes),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    /// Hidden cases never expose their input/expected/actual text across
    /// the system boundary; only classification and timing leave the judge.
    pub hidden: bool,
    /// Carried from the problem schema; scoring uses the percentage rule,
    /// not weights.
    pub weight: Option<u32>,
    pub time_limit_ms: Option<u64>,
    pub memory_limit_bytes: Option<u64>,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        TestCase {
            input: input.into(),
            expected_output: expected_output.into(),
            hidden: false,
            weight: None,
            time_limit_ms: None,
            memory_limit_bytes: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// One accepted submission. Immutable after construction.
#[derive(Clone, Debug)]
pub struct Submission {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub problem_id: Uuid,
    pub source: String,
}

impl Submission {
    pub fn new(problem_id: Uuid, source: impl Into<String>) -> Self {
        Submission {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            problem_id,
            source: source.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionLimits {
    pub time_ms: u64,
    /// Carried through for future enforcement; the process sandbox does not
    /// apply memory limits (see the hardening notes in DESIGN.md).
    pub memory_bytes: Option<u64>,
}

/// Raw result of running the compiled artifact against one input.
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub execution_time_ms: u64,
    pub timed_out: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    WrongAnswer,
    RuntimeError,
    TimeLimitExceeded,
}

/// Classification of one test case run. `actual_output`/`expected_output`
/// are `None` when the source case is hidden.
#[derive(Clone, Debug)]
pub struct CaseResult {
    pub case_number: usize,
    pub outcome: CaseOutcome,
    pub execution_time_ms: u64,
    pub actual_output: Option<String>,
    pub expected_output: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverallOutcome {
    Passed,
    Failed,
    CompileError,
}

/// Aggregate grading result of a submission against all cases of a problem.
#[derive(Clone, Debug)]
pub struct Verdict {
    pub overall: OverallOutcome,
    /// 0..=100, percentage of cases passed rounded to the nearest integer.
    pub score: u8,
    pub passed_count: usize,
    pub total_count: usize,
    pub average_execution_time_ms: u64,
    pub cases: Vec<CaseResult>,
    pub compile_diagnostic: Option<String>,
}

impl Verdict {
    pub fn compile_error(diagnostic: impl Into<String>) -> Self {
        Verdict {
            overall: OverallOutcome::CompileError,
            score: 0,
            passed_count: 0,
            total_count: 0,
            average_execution_time_ms: 0,
            cases: Vec::new(),
            compile_diagnostic: Some(diagnostic.into()),
        }
    }

    /// Aggregates classified cases: `score` is the rounded percentage of
    /// cases passed, and `overall` is `Passed` only when every case passed.
    ///
    /// An empty case list reports `Failed` with `score = 0` rather than a
    /// vacuous pass: a submission cannot pass a problem with nothing to
    /// check, and a `Passed` verdict carrying a zero score would contradict
    /// the boundary's `passed` flag.
    pub fn from_cases(cases: Vec<CaseResult>) -> Self {
        let total_count = cases.len();
        let passed_count = cases
            .iter()
            .filter(|c| c.outcome == CaseOutcome::Passed)
            .count();
        let score = if total_count == 0 {
            0
        } else {
            (100.0 * passed_count as f64 / total_count as f64).round() as u8
        };
        let average_execution_time_ms = if total_count == 0 {
            0
        } else {
            cases.iter().map(|c| c.execution_time_ms).sum::<u64>() / total_count as u64
        };
        let overall = if passed_count == total_count && total_count > 0 {
            OverallOutcome::Passed
        } else {
            OverallOutcome::Failed
        };
        Verdict {
            overall,
            score,
            passed_count,
            total_count,
            average_execution_time_ms,
            cases,
            compile_diagnostic: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.overall == OverallOutcome::Passed
    }
}

/// Result of an ungraded ad hoc run. Compile rejection is part of the
/// outcome rather than an error so callers can show the diagnostic to the
/// author directly.
#[derive(Clone, Debug)]
pub enum AdHocOutcome {
    Executed(ExecutionOutcome),
    CompileRejected { diagnostic: String },
}
