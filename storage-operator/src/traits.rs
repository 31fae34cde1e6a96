use async_trait::async_trait;
use codeloom_types::{JobInfo, JobParams, JobStatus};

use crate::error::OrchestratorError;

/// Uniform interface over a cluster backend (real or mock). All
/// operations are keyed by the workload name (`codespace-{sid}`).
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Idempotent. Creates the workload suspended if it does not
    /// exist yet; otherwise returns its current info.
    async fn allocate(&self, params: &JobParams) -> Result<JobInfo, OrchestratorError>;

    /// Ensures the workload is allocated, then resumes/updates it to
    /// match `params`.
    async fn submit(&self, params: &JobParams) -> Result<JobInfo, OrchestratorError>;

    async fn status(&self, name: &str) -> Result<JobStatus, OrchestratorError>;

    async fn info(&self, name: &str) -> Result<JobInfo, OrchestratorError>;

    /// Scales the workload to zero replicas, recording the prior
    /// count for a later `submit` to restore.
    async fn suspend(&self, name: &str) -> Result<(), OrchestratorError>;

    /// Deletes the workload and its service. A 404 on either is
    /// success.
    async fn release(&self, name: &str) -> Result<(), OrchestratorError>;

    async fn logs(&self, name: &str, tail_lines: i64) -> Result<String, OrchestratorError>;

    async fn list(&self) -> Result<Vec<JobInfo>, OrchestratorError>;
}
