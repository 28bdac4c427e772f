use std::path::PathBuf;
use std::process::Stdio;

use tokio::fs;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

use crate::config::JudgeConfig;
use crate::error::JudgeError;
use crate::workspace::Workspace;

/// Result of a toolchain invocation. `Rejected` is the submitter's problem
/// (diagnostics attached); infrastructure failures surface as `JudgeError`.
#[derive(Clone, Debug)]
pub enum CompileOutcome {
    Compiled,
    Rejected { diagnostic: String },
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait Compiler: std::fmt::Debug + Send + Sync {
    async fn compile(
        &self,
        source: &str,
        workspace: &Workspace,
    ) -> Result<CompileOutcome, JudgeError>;
}

/// Invokes gcc with an explicit argument vector against the workspace's
/// source path. No shell is involved anywhere, so submission content and
/// filenames cannot be interpolated into a command line.
#[derive(Clone, Debug)]
pub struct GccCompiler {
    gcc_path: PathBuf,
    compile_timeout: Duration,
}

impl GccCompiler {
    pub fn new(config: &JudgeConfig) -> Self {
        GccCompiler {
            gcc_path: config.gcc_path.clone(),
            compile_timeout: Duration::from_millis(config.compile_timeout_ms),
        }
    }
}

#[async_trait::async_trait]
impl Compiler for GccCompiler {
    #[tracing::instrument(skip(self, source), fields(workspace = %workspace.id()))]
    async fn compile(
        &self,
        source: &str,
        workspace: &Workspace,
    ) -> Result<CompileOutcome, JudgeError> {
        let source_path = workspace.source_path();
        let binary_path = workspace.binary_path();

        fs::write(&source_path, source)
            .await
            .map_err(JudgeError::Workspace)?;

        let mut cmd = Command::new(&self.gcc_path);
        cmd.arg(&source_path)
            .arg("-o")
            .arg(&binary_path)
            .arg("-O2")
            .arg("-std=c17")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(JudgeError::Spawn)?;

        let output = match timeout(self.compile_timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(JudgeError::Spawn)?,
            Err(_) => {
                // Child is dropped by the timeout branch and SIGKILLed.
                tracing::warn!(timeout_ms = self.compile_timeout.as_millis() as u64,
                    "toolchain exceeded compile timeout");
                return Ok(CompileOutcome::Rejected {
                    diagnostic: format!(
                        "compilation timed out after {} ms",
                        self.compile_timeout.as_millis()
                    ),
                });
            }
        };

        if !output.status.success() {
            let diagnostic = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::debug!("toolchain rejected submission");
            return Ok(CompileOutcome::Rejected { diagnostic });
        }

        if !fs::try_exists(&binary_path).await.unwrap_or(false) {
            return Err(JudgeError::internal(format!(
                "toolchain reported success but produced no artifact at {}",
                binary_path.display()
            )));
        }

        tracing::debug!("compiled artifact ready");
        Ok(CompileOutcome::Compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceManager;
    use std::sync::Arc;
    use uuid::Uuid;

    const CORRECT_CODE: &str = "
        #include <stdio.h>
        int main() {
            printf(\"Hello, World!\\n\");
            return 0;
        }";

    const INCORRECT_CODE: &str = "
        #include <stdio.h>
        int main() {
            printf(\"Hello, World!\\n\")
            return 0;
        }";

    fn test_config() -> JudgeConfig {
        JudgeConfig {
            gcc_path: std::env::var("GCC_PATH")
                .unwrap_or_else(|_| "/usr/bin/gcc".to_string())
                .into(),
            workspace_root: std::env::temp_dir().join(format!("codeforge_test_{}", Uuid::new_v4())),
            ..JudgeConfig::default()
        }
    }

    async fn workspace(config: &JudgeConfig) -> (Arc<WorkspaceManager>, Workspace) {
        let manager = Arc::new(WorkspaceManager::new(&config.workspace_root));
        let workspace = manager.allocate().await.unwrap();
        (manager, workspace)
    }

    #[tokio::test]
    async fn compile_success_produces_runnable_artifact() {
        let config = test_config();
        let compiler = GccCompiler::new(&config);
        let (manager, workspace) = workspace(&config).await;

        let outcome = compiler.compile(CORRECT_CODE, &workspace).await.unwrap();
        assert!(matches!(outcome, CompileOutcome::Compiled));

        let out = Command::new(workspace.binary_path())
            .output()
            .await
            .expect("failed to run compiled artifact");
        assert_eq!(String::from_utf8_lossy(&out.stdout), "Hello, World!\n");

        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn compile_error_carries_diagnostic() {
        let config = test_config();
        let compiler = GccCompiler::new(&config);
        let (manager, workspace) = workspace(&config).await;

        let outcome = compiler.compile(INCORRECT_CODE, &workspace).await.unwrap();
        match outcome {
            CompileOutcome::Rejected { diagnostic } => {
                assert!(diagnostic.contains("error"), "diagnostic: {diagnostic}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        manager.release(workspace).await;
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn hung_toolchain_is_rejected_at_the_compile_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let mut config = test_config();
        config.compile_timeout_ms = 300;
        let (manager, workspace) = workspace(&config).await;

        // Stand-in toolchain that never finishes.
        let stub = workspace.scratch_path("gcc_stub.sh");
        tokio::fs::write(&stub, "#!/bin/sh\nsleep 30\n").await.unwrap();
        tokio::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755))
            .await
            .unwrap();
        config.gcc_path = stub;
        let compiler = GccCompiler::new(&config);

        let start = std::time::Instant::now();
        let outcome = compiler.compile(CORRECT_CODE, &workspace).await.unwrap();
        match outcome {
            CompileOutcome::Rejected { diagnostic } => {
                assert!(diagnostic.contains("timed out"), "diagnostic: {diagnostic}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(
            start.elapsed() < std::time::Duration::from_secs(5),
            "compile was not cut off: {:?}",
            start.elapsed()
        );

        manager.release(workspace).await;
    }

    #[tokio::test]
    async fn compiling_identical_source_twice_is_deterministic() {
        let config = test_config();
        let compiler = GccCompiler::new(&config);

        let (manager_a, workspace_a) = workspace(&config).await;
        let (manager_b, workspace_b) = workspace(&config).await;

        let first = compiler.compile(CORRECT_CODE, &workspace_a).await.unwrap();
        let second = compiler.compile(CORRECT_CODE, &workspace_b).await.unwrap();
        assert!(matches!(first, CompileOutcome::Compiled));
        assert!(matches!(second, CompileOutcome::Compiled));

        manager_a.release(workspace_a).await;
        manager_b.release(workspace_b).await;
    }
}
