//! Per-job working directories
//!
//! Every grading attempt compiles and runs inside its own directory, named
//! after the job's id plus a fresh attempt id. Source files and artifacts
//! never take their names from submitted content, and grading the same job
//! twice at once never shares files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove workspace {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace pool is closed")]
    PoolClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Working directory of a single grading attempt
///
/// # Cleanup
///
/// Call [`cleanup()`](Self::cleanup) once every test of the job has run. The
/// `Drop` implementation removes the directory synchronously as a fallback
/// and logs a warning.
#[derive(Debug)]
pub struct JobWorkspace {
    job_id: Uuid,

    /// `<work_dir>/job-<id>-<attempt>`
    dir: PathBuf,

    /// Whether the directory still exists
    active: bool,

    /// Pool permit (if acquired from a pool)
    _permit: Option<OwnedSemaphorePermit>,
}

impl JobWorkspace {
    /// Create a fresh working directory for one attempt at grading a job
    ///
    /// Fails instead of reusing a directory that already exists.
    #[instrument(skip(work_dir), fields(work_dir = %work_dir.as_ref().display()))]
    pub async fn create(work_dir: impl AsRef<Path>, job_id: Uuid) -> Result<Self, WorkspaceError> {
        let work_dir = work_dir.as_ref();
        let dir = work_dir.join(format!(
            "job-{}-{}",
            job_id.as_simple(),
            Uuid::new_v4().as_simple()
        ));

        let create_error = |source: std::io::Error| WorkspaceError::CreateFailed {
            path: dir.clone(),
            source,
        };
        tokio::fs::create_dir_all(work_dir).await.map_err(create_error)?;
        tokio::fs::create_dir(&dir).await.map_err(create_error)?;

        debug!(dir = %dir.display(), "workspace created");

        Ok(Self {
            job_id,
            dir,
            active: true,
            _permit: None,
        })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Path to the job directory
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// File stem shared by the job's source and artifact (e.g., "job_1f2e...")
    ///
    /// Only letters, digits and underscores, so toolchains that derive a
    /// module or crate name from the file name accept it.
    pub fn stem(&self) -> String {
        format!("job_{}", self.job_id.as_simple())
    }

    /// Absolute artifact stem, substituted for `{output}`
    pub fn artifact_stem(&self) -> PathBuf {
        self.dir.join(self.stem())
    }

    /// Path of the source file with the given extension
    pub fn source_path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{extension}", self.stem()))
    }

    /// Write the submitted source into the workspace and return its path
    #[instrument(skip(self, content), fields(job_id = %self.job_id))]
    pub async fn write_source(
        &self,
        extension: &str,
        content: &[u8],
    ) -> Result<PathBuf, WorkspaceError> {
        let path = self.source_path(extension);
        tokio::fs::write(&path, content).await?;
        debug!(path = %path.display(), len = content.len(), "wrote source file");
        Ok(path)
    }

    /// Remove the workspace and everything in it
    ///
    /// # Errors
    ///
    /// Returns an error if the directory could not be removed.
    #[must_use = "cleanup errors should be handled"]
    #[instrument(skip(self), fields(job_id = %self.job_id))]
    pub async fn cleanup(&mut self) -> Result<(), WorkspaceError> {
        if !self.active {
            return Ok(());
        }

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                warn!(dir = %self.dir.display(), error = %source, "cleanup failed");
                return Err(WorkspaceError::CleanupFailed {
                    path: self.dir.clone(),
                    source,
                });
            }
        }

        self.active = false;
        debug!("workspace removed");
        Ok(())
    }

    /// Check if the workspace directory has not been removed yet
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Attach a pool permit to this workspace
    pub(crate) fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self._permit = Some(permit);
        self
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.active {
            warn!(
                job_id = %self.job_id,
                dir = %self.dir.display(),
                "JobWorkspace dropped without explicit cleanup, removing synchronously"
            );
            if let Err(e) = std::fs::remove_dir_all(&self.dir)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!(dir = %self.dir.display(), error = %e, "best-effort cleanup failed");
            }
        }
    }
}

/// Bounded set of job workspaces
///
/// Limits how many jobs a grader works on at once. Each acquired workspace
/// holds a permit until it is dropped.
#[derive(Debug, Clone)]
pub struct WorkspacePool {
    work_dir: PathBuf,

    capacity: usize,

    semaphore: Arc<Semaphore>,
}

impl WorkspacePool {
    /// Create a new pool rooted at `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            work_dir: work_dir.into(),
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Wait for a free slot and create the workspace for `job_id`
    #[instrument(skip(self))]
    pub async fn acquire(&self, job_id: Uuid) -> Result<JobWorkspace, WorkspaceError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkspaceError::PoolClosed)?;

        debug!(available = self.available(), "acquired workspace slot");

        let workspace = JobWorkspace::create(&self.work_dir, job_id).await?;
        Ok(workspace.with_permit(permit))
    }

    /// Get the number of free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}
