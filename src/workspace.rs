use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use uuid::Uuid;

use crate::error::JudgeError;

/// Hands out exclusively-owned scratch directories, one per evaluation.
///
/// Ids combine an atomic sequence number with a random token, so two
/// allocations in the same instant can never collide the way wall-clock
/// derived names do.
#[derive(Debug)]
pub struct WorkspaceManager {
    root: PathBuf,
    counter: AtomicU64,
}

impl WorkspaceManager {
    pub fn new(root: impl AsRef<Path>) -> Self {
        WorkspaceManager {
            root: root.as_ref().into(),
            counter: AtomicU64::new(0),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn allocate(&self) -> Result<Workspace, JudgeError> {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}-{}", seq, Uuid::new_v4());
        let dir = self.root.join(&id);

        fs::create_dir_all(&dir)
            .await
            .map_err(JudgeError::Workspace)?;

        tracing::debug!(workspace = %id, "allocated workspace");
        Ok(Workspace {
            id,
            dir,
            released: false,
        })
    }

    /// Removes every artifact of the workspace. Failures are logged and
    /// swallowed so they can never mask the result of the evaluation that
    /// owned it.
    #[tracing::instrument(skip(self, workspace), fields(workspace = %workspace.id))]
    pub async fn release(&self, mut workspace: Workspace) {
        workspace.released = true;
        if let Err(e) = fs::remove_dir_all(&workspace.dir).await {
            tracing::warn!(error = %e, "failed to remove workspace directory");
        } else {
            tracing::debug!("released workspace");
        }
    }
}

/// Ephemeral scratch scope for one evaluation: source file, compiled
/// artifact, and per-case buffering all live under one private directory.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join("main.c")
    }

    pub fn binary_path(&self) -> PathBuf {
        self.dir.join("main.out")
    }

    pub fn scratch_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // Backstop for exit paths that never reach release(), including
        // panics. Errors are ignored: the directory is usually gone already.
        if !self.released {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}
