use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::{Duration, Instant, timeout};

use crate::domain::{ExecutionLimits, ExecutionOutcome};
use crate::error::JudgeError;

#[mockall::automock]
#[async_trait::async_trait]
pub trait Sandbox: std::fmt::Debug + Send + Sync {
    async fn run(
        &self,
        binary: &Path,
        input: &str,
        limits: &ExecutionLimits,
    ) -> Result<ExecutionOutcome, JudgeError>;
}

/// Runs a compiled artifact as a child process under a wall-clock deadline.
///
/// The binary is executed directly, never through a shell. On deadline
/// expiry the entire process group is SIGKILLed, so processes the
/// submission forked die with it. This provides no memory, CPU or
/// filesystem isolation; production deployments must wrap it in OS-level
/// sandboxing (see DESIGN.md).
#[derive(Clone, Debug, Default)]
pub struct ProcessSandbox;

impl ProcessSandbox {
    pub fn new() -> Self {
        ProcessSandbox
    }

    async fn terminate(child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // The child was spawned as its own group leader, so this takes
            // down everything it forked as well.
            unsafe {
                libc::killpg(pid as i32, libc::SIGKILL);
            }
        }
        if let Err(e) = child.kill().await {
            tracing::warn!(error = %e, "failed to kill timed-out process");
        }
    }
}

#[async_trait::async_trait]
impl Sandbox for ProcessSandbox {
    #[tracing::instrument(skip(self, input), fields(binary = %binary.display()))]
    async fn run(
        &self,
        binary: &Path,
        input: &str,
        limits: &ExecutionLimits,
    ) -> Result<ExecutionOutcome, JudgeError> {
        let mut cmd = Command::new(binary);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(JudgeError::Spawn)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| JudgeError::internal("child stdin was not piped"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| JudgeError::internal("child stdout was not piped"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| JudgeError::internal("child stderr was not piped"))?;

        // Both output pipes must be drained concurrently: reading only one
        // while the child fills the other deadlocks once the pipe buffer is
        // full.
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        // Stdin gets its own task for the same reason: a child that never
        // reads must not stall the judge past the deadline. Dropping the
        // handle closes the pipe and signals EOF. Write errors are expected
        // when the child exits without consuming its input.
        let input = input.as_bytes().to_vec();
        let stdin_task = tokio::spawn(async move {
            let _ = stdin.write_all(&input).await;
        });

        let deadline = Duration::from_millis(limits.time_ms);
        let (exit_code, timed_out) = match timeout(deadline, child.wait()).await {
            Ok(status) => {
                let status = status.map_err(JudgeError::Spawn)?;
                (status.code().unwrap_or(-1), false)
            }
            Err(_) => {
                tracing::debug!(limit_ms = limits.time_ms, "deadline expired, killing process group");
                Self::terminate(&mut child).await;
                (-1, true)
            }
        };
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let _ = stdin_task.await;
        let stdout = stdout_task
            .await
            .map_err(|e| JudgeError::internal(format!("stdout drain task failed: {e}")))?;
        let stderr = stderr_task
            .await
            .map_err(|e| JudgeError::internal(format!("stderr drain task failed: {e}")))?;

        Ok(ExecutionOutcome {
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            exit_code,
            execution_time_ms,
            timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileOutcome, Compiler, GccCompiler};
    use crate::config::JudgeConfig;
    use crate::workspace::{Workspace, WorkspaceManager};
    use std::sync::Arc;
    use uuid::Uuid;

    fn limits(time_ms: u64) -> ExecutionLimits {
        ExecutionLimits {
            time_ms,
            memory_bytes: None,
        }
    }

    async fn compile_fixture(source: &str) -> (Arc<WorkspaceManager>, Workspace) {
        let config = JudgeConfig {
            gcc_path: std::env::var("GCC_PATH")
                .unwrap_or_else(|_| "/usr/bin/gcc".to_string())
                .into(),
            workspace_root: std::env::temp_dir().join(format!("codeforge_test_{}", Uuid::new_v4())),
            ..JudgeConfig::default()
        };
        let manager = Arc::new(WorkspaceManager::new(&config.workspace_root));
        let workspace = manager.allocate().await.unwrap();
        let outcome = GccCompiler::new(&config)
            .compile(source, &workspace)
            .await
            .unwrap();
        assert!(matches!(outcome, CompileOutcome::Compiled));
        (manager, workspace)
    }

    #[tokio::test]
    async fn echoes_stdin_to_stdout() {
        let (manager, workspace) = compile_fixture(
            "
            #include <stdio.h>
            int main() {
                int c;
                while ((c = getchar()) != EOF) putchar(c);
                return 0;
            }",
        )
        .await;

        let outcome = ProcessSandbox::new()
            .run(&workspace.binary_path(), "42\n", &limits(2000))
            .await
            .unwrap();

        assert_eq!(outcome.stdout, "42\n");
        assert_eq!(outcome.exit_code, 0);
        assert!(!outcome.timed_out);
        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn reports_nonzero_exit_code() {
        let (manager, workspace) = compile_fixture("int main() { return 3; }").await;

        let outcome = ProcessSandbox::new()
            .run(&workspace.binary_path(), "", &limits(2000))
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, 3);
        assert!(!outcome.timed_out);
        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn nonterminating_program_times_out_within_bound() {
        let (manager, workspace) = compile_fixture("int main() { for (;;) {} }").await;

        let start = std::time::Instant::now();
        let outcome = ProcessSandbox::new()
            .run(&workspace.binary_path(), "", &limits(1000))
            .await
            .unwrap();

        assert!(outcome.timed_out);
        assert!(outcome.execution_time_ms >= 1000);
        assert!(
            start.elapsed() < std::time::Duration::from_secs(4),
            "kill took too long: {:?}",
            start.elapsed()
        );
        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn forked_children_die_with_the_process_group() {
        let (manager, workspace) = compile_fixture(
            "
            #include <unistd.h>
            int main() {
                if (fork() == 0) { sleep(30); return 0; }
                for (;;) {}
            }",
        )
        .await;

        // The forked child inherits the output pipes; if it survived the
        // kill, draining them would block until its sleep finished.
        let start = std::time::Instant::now();
        let outcome = ProcessSandbox::new()
            .run(&workspace.binary_path(), "", &limits(500))
            .await
            .unwrap();

        assert!(outcome.timed_out);
        assert!(
            start.elapsed() < std::time::Duration::from_secs(5),
            "process tree survived the kill: {:?}",
            start.elapsed()
        );
        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn drains_both_pipes_without_deadlock() {
        let (manager, workspace) = compile_fixture(
            "
            #include <stdio.h>
            int main() {
                for (int i = 0; i < 20000; i++) {
                    fprintf(stdout, \"stdout line %d\\n\", i);
                    fprintf(stderr, \"stderr line %d\\n\", i);
                }
                return 0;
            }",
        )
        .await;

        let outcome = ProcessSandbox::new()
            .run(&workspace.binary_path(), "", &limits(5000))
            .await
            .unwrap();

        assert!(!outcome.timed_out);
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.contains("stdout line 19999"));
        assert!(outcome.stderr.contains("stderr line 19999"));
        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let result = ProcessSandbox::new()
            .run(Path::new("/nonexistent/binary"), "", &limits(1000))
            .await;
        assert!(matches!(result, Err(JudgeError::Spawn(_))));
    }
}
