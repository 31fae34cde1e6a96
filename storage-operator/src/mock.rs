use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use codeloom_types::{JobInfo, JobParams, JobStatus};

use crate::error::OrchestratorError;
use crate::traits::Orchestrator;

struct Entry {
    info: JobInfo,
    suspended: bool,
}

/// In-process stand-in for the cluster, used in tests and local
/// development. Keyed by workload name, the same key the real
/// backend uses.
#[derive(Default)]
pub struct MockOrchestrator {
    jobs: Mutex<BTreeMap<String, Entry>>,
}

impl MockOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Orchestrator for MockOrchestrator {
    async fn allocate(&self, params: &JobParams) -> Result<JobInfo, OrchestratorError> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(entry) = jobs.get(&params.name) {
            return Ok(entry.info.clone());
        }
        let info = JobInfo {
            id: params.name.clone(),
            name: params.name.clone(),
            namespace: "codespaces".to_string(),
            user_id: params.user_id.clone(),
            image: params.image.clone(),
            ports: params.ports.clone(),
            env: params.env.clone(),
            status: JobStatus::Suspended,
            service_url: "pending".to_string(),
            created_at: 0,
        };
        jobs.insert(params.name.clone(), Entry { info: info.clone(), suspended: true });
        Ok(info)
    }

    async fn submit(&self, params: &JobParams) -> Result<JobInfo, OrchestratorError> {
        self.allocate(params).await?;
        let mut jobs = self.jobs.lock().unwrap();
        let entry = jobs
            .get_mut(&params.name)
            .ok_or_else(|| OrchestratorError::NotFound(params.name.clone()))?;
        entry.suspended = false;
        entry.info.image = params.image.clone();
        entry.info.env = params.env.clone();
        entry.info.status = JobStatus::Running;
        entry.info.service_url = format!("http://mock-cluster.local/{}", params.name);
        Ok(entry.info.clone())
    }

    async fn status(&self, name: &str) -> Result<JobStatus, OrchestratorError> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(name)
            .map(|e| e.info.status)
            .ok_or_else(|| OrchestratorError::NotFound(name.to_string()))
    }

    async fn info(&self, name: &str) -> Result<JobInfo, OrchestratorError> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(name)
            .map(|e| e.info.clone())
            .ok_or_else(|| OrchestratorError::NotFound(name.to_string()))
    }

    async fn suspend(&self, name: &str) -> Result<(), OrchestratorError> {
        let mut jobs = self.jobs.lock().unwrap();
        let entry = jobs.get_mut(name).ok_or_else(|| OrchestratorError::NotFound(name.to_string()))?;
        entry.suspended = true;
        entry.info.status = JobStatus::Suspended;
        entry.info.service_url = "pending".to_string();
        Ok(())
    }

    async fn release(&self, name: &str) -> Result<(), OrchestratorError> {
        self.jobs.lock().unwrap().remove(name);
        Ok(())
    }

    async fn logs(&self, name: &str, _tail_lines: i64) -> Result<String, OrchestratorError> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(name)
            .map(|_| format!("mock logs for {name}\n"))
            .ok_or_else(|| OrchestratorError::NotFound(name.to_string()))
    }

    async fn list(&self) -> Result<Vec<JobInfo>, OrchestratorError> {
        Ok(self.jobs.lock().unwrap().values().map(|e| e.info.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeloom_types::PortMapping;

    fn params(name: &str) -> JobParams {
        JobParams {
            name: name.to_string(),
            user_id: "24111352".to_string(),
            image: "codespace-base:latest".to_string(),
            ports: vec![PortMapping::tcp("ide", 8080, 8080)],
            env: BTreeMap::new(),
            limits: Default::default(),
        }
    }

    #[tokio::test]
    async fn allocate_is_idempotent() {
        let orch = MockOrchestrator::new();
        let a = orch.allocate(&params("codespace-1")).await.unwrap();
        let b = orch.allocate(&params("codespace-1")).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.status, JobStatus::Suspended);
    }

    #[tokio::test]
    async fn submit_then_suspend_round_trips_status() {
        let orch = MockOrchestrator::new();
        orch.submit(&params("codespace-1")).await.unwrap();
        assert_eq!(orch.status("codespace-1").await.unwrap(), JobStatus::Running);

        orch.suspend("codespace-1").await.unwrap();
        assert_eq!(orch.status("codespace-1").await.unwrap(), JobStatus::Suspended);
    }

    #[tokio::test]
    async fn release_removes_the_workload() {
        let orch = MockOrchestrator::new();
        orch.allocate(&params("codespace-1")).await.unwrap();
        orch.release("codespace-1").await.unwrap();
        assert!(matches!(orch.status("codespace-1").await, Err(OrchestratorError::NotFound(_))));
    }

    #[tokio::test]
    async fn operations_on_unknown_workload_are_not_found() {
        let orch = MockOrchestrator::new();
        assert!(matches!(orch.info("ghost").await, Err(OrchestratorError::NotFound(_))));
        assert!(matches!(orch.suspend("ghost").await, Err(OrchestratorError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_reflects_allocated_workloads() {
        let orch = MockOrchestrator::new();
        orch.allocate(&params("a")).await.unwrap();
        orch.allocate(&params("b")).await.unwrap();
        let names: Vec<_> = orch.list().await.unwrap().into_iter().map(|j| j.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
    }
}
