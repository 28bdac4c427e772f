use std::path::PathBuf;

/// Tunables for the judging pipeline.
///
/// Every field has a sensible default; `from_env` overrides them from the
/// environment so deployments can point at a pinned toolchain or move the
/// workspace root off tmpfs.
#[derive(Clone, Debug)]
pub struct JudgeConfig {
    /// Path to the C compiler binary.
    pub gcc_path: PathBuf,
    /// Directory under which per-evaluation workspaces are created.
    pub workspace_root: PathBuf,
    /// Wall-clock bound on a single toolchain invocation.
    pub compile_timeout_ms: u64,
    /// Per-case wall-clock limit used when neither the problem nor the
    /// test case specifies one, and for ad hoc runs.
    pub time_limit_ms: u64,
    /// Upper bound on evaluations running at the same time.
    pub max_concurrent_evaluations: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        JudgeConfig {
            gcc_path: PathBuf::from("/usr/bin/gcc"),
            workspace_root: std::env::temp_dir().join("codeforge"),
            compile_timeout_ms: 10_000,
            time_limit_ms: 5_000,
            max_concurrent_evaluations: 16,
        }
    }
}

impl JudgeConfig {
    pub fn from_env() -> Self {
        let defaults = JudgeConfig::default();
        JudgeConfig {
            gcc_path: std::env::var("GCC_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.gcc_path),
            workspace_root: std::env::var("CODEFORGE_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            compile_timeout_ms: env_u64("CODEFORGE_COMPILE_TIMEOUT_MS")
                .unwrap_or(defaults.compile_timeout_ms),
            time_limit_ms: env_u64("CODEFORGE_TIME_LIMIT_MS").unwrap_or(defaults.time_limit_ms),
            max_concurrent_evaluations: env_u64("CODEFORGE_MAX_CONCURRENT")
                .map(|n| n as usize)
                .unwrap_or(defaults.max_concurrent_evaluations),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
