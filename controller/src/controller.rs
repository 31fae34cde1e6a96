use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use codeloom_auth::TokenCodec;
use codeloom_orchestrator::Orchestrator;
use codeloom_store::{CodespaceStatus, Student, StudentStore, UserInfo};
use codeloom_types::{JobParams, JobStatus};
use owo_colors::OwoColorize;
use tokio::sync::Semaphore;

use crate::config::CodespaceConfig;
use crate::error::ControllerError;
use crate::locks::SidLocks;

/// What `getURL` reports for a student's codespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodespaceUrl {
    Ready(String),
    Pending,
    None,
}

fn workload_name(sid: &str) -> String {
    format!("codespace-{sid}")
}

/// A job's `service_url` is only a real address once it starts with a
/// scheme; the orchestrator otherwise reports sentinels like `"pending"`.
fn is_resolved_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Single authoritative state machine over every student's codespace,
/// reconciling the record in [`StudentStore`] with the orchestrator.
pub struct Controller {
    store: StudentStore,
    orchestrator: Arc<dyn Orchestrator>,
    config: CodespaceConfig,
    tokens: TokenCodec,
    locks: SidLocks,
}

impl Controller {
    pub fn new(
        store: StudentStore,
        orchestrator: Arc<dyn Orchestrator>,
        config: CodespaceConfig,
        tokens: TokenCodec,
    ) -> Self {
        Self {
            store,
            orchestrator,
            config,
            tokens,
            locks: SidLocks::new(),
        }
    }

    pub fn store(&self) -> &StudentStore {
        &self.store
    }

    fn derive_params(&self, sid: &str) -> JobParams {
        let token = self.tokens.encode(sid);
        let mut env = BTreeMap::new();
        env.insert("STUDENT_ID".to_string(), sid.to_string());
        env.insert("PASSWORD".to_string(), token.clone());
        env.insert("SUDO_PASSWORD".to_string(), token.clone());
        env.insert("STUDENT_API_KEY".to_string(), token);

        JobParams {
            name: workload_name(sid),
            user_id: sid.to_string(),
            image: self.config.image.clone(),
            ports: self.config.ports.clone(),
            env,
            limits: Default::default(),
        }
    }

    /// Enrolls a new student: creates the record and directory tree,
    /// then allocates the (suspended) workload. Rolls the record back
    /// if allocation fails, so a partial enrollment never persists.
    pub async fn create_student(
        &self,
        sid: &str,
        user_info: UserInfo,
        pwd_hash: String,
        time_quota: i64,
    ) -> Result<Student, ControllerError> {
        let _guard = self.locks.lock(sid).await;

        let mut student = Student::new(sid);
        student.user_info = user_info;
        student.pwd_hash = pwd_hash;
        student.codespace.time_quota = time_quota;

        let now = Utc::now().timestamp();
        self.store
            .create_record(student.clone(), now)
            .await
            .map_err(|e| ControllerError::from_store(sid, e))?;

        let params = self.derive_params(sid);
        if let Err(e) = self.orchestrator.allocate(&params).await {
            println!("{}", format!("allocation failed for {sid:?}, rolling back enrollment: {e}").red());
            self.store.rollback_create(sid).await.ok();
            return Err(e.into());
        }

        student.codespace.last_start = now;
        student.codespace.last_stop = now;
        student.codespace.last_active = now;
        student.codespace.last_watch = now;
        Ok(student)
    }

    /// Releases the workload, archives the directory tree, and drops
    /// the record. The record is removed even if the workload was
    /// already gone (release is 404-tolerant at the adapter).
    pub async fn delete_student(&self, sid: &str) -> Result<(), ControllerError> {
        let _guard = self.locks.lock(sid).await;
        self.orchestrator.release(&workload_name(sid)).await?;
        self.store.delete_record(sid).await.map_err(|e| ControllerError::from_store(sid, e))
    }

    /// Idempotent; safe at any state. Does not transition `status`.
    pub async fn allocate(&self, sid: &str) -> Result<(), ControllerError> {
        let params = self.derive_params(sid);
        self.orchestrator.allocate(&params).await?;
        Ok(())
    }

    pub async fn start(&self, sid: &str) -> Result<(), ControllerError> {
        let _guard = self.locks.lock(sid).await;
        let mut student = self.store.read(sid).await.map_err(|e| ControllerError::from_store(sid, e))?;

        if student.codespace.status == CodespaceStatus::Running {
            return Ok(());
        }

        if student.codespace.time_quota > 0 && student.codespace.time_used >= student.codespace.time_quota {
            return Err(ControllerError::QuotaExceeded(sid.to_string()));
        }

        student.codespace.status = CodespaceStatus::Starting;
        self.store.write(&student).await?;

        let params = self.derive_params(sid);
        match self.orchestrator.submit(&params).await {
            Ok(info) => {
                let now = Utc::now().timestamp();
                if is_resolved_url(&info.service_url) {
                    student.codespace.status = CodespaceStatus::Running;
                    student.codespace.url = info.service_url;
                } else {
                    // Scale-up succeeded but the load balancer hasn't
                    // assigned an address yet; stay in Starting so I1
                    // (Running implies a real url) holds until the
                    // watcher or a later getStatus resolves it.
                    student.codespace.status = CodespaceStatus::Starting;
                    student.codespace.url.clear();
                }
                student.codespace.last_start = now;
                student.codespace.last_active = now;
                student.codespace.last_watch = now;
                self.store.write(&student).await?;
                Ok(())
            }
            Err(e) => {
                student.codespace.status = CodespaceStatus::Stopped;
                self.store.write(&student).await.ok();
                Err(ControllerError::StartFailed { sid: sid.to_string(), cause: e.to_string() })
            }
        }
    }

    pub async fn stop(&self, sid: &str) -> Result<(), ControllerError> {
        let _guard = self.locks.lock(sid).await;
        let mut student = self.store.read(sid).await.map_err(|e| ControllerError::from_store(sid, e))?;

        if student.codespace.status == CodespaceStatus::Stopped {
            return Ok(());
        }

        self.stop_locked(sid, &mut student).await
    }

    /// Shared by `stop` and `tick`'s quota-eviction path; assumes the
    /// per-`sid` lock is already held.
    async fn stop_locked(&self, sid: &str, student: &mut Student) -> Result<(), ControllerError> {
        let result = self.orchestrator.suspend(&workload_name(sid)).await;

        let now = Utc::now().timestamp();
        let base = student.codespace.last_start.max(student.codespace.last_watch);
        student.codespace.time_used += (now - base).max(0);
        student.codespace.status = CodespaceStatus::Stopped;
        student.codespace.url.clear();
        student.codespace.last_stop = now;
        self.store.write(student).await?;

        result.map_err(|e| ControllerError::StopFailed { sid: sid.to_string(), cause: e.to_string() })
    }

    pub async fn get_status(&self, sid: &str) -> Result<CodespaceStatus, ControllerError> {
        let mut student = self.store.read(sid).await.map_err(|e| ControllerError::from_store(sid, e))?;

        if student.codespace.status == CodespaceStatus::Stopped {
            return Ok(CodespaceStatus::Stopped);
        }

        let observed = self.orchestrator.status(&workload_name(sid)).await;
        let resolved = match observed {
            Ok(JobStatus::Running) => CodespaceStatus::Running,
            Ok(JobStatus::Pending) | Ok(JobStatus::Starting) => CodespaceStatus::Starting,
            Ok(JobStatus::Suspended) | Ok(JobStatus::Failed) | Err(_) => CodespaceStatus::Stopped,
        };

        if resolved != student.codespace.status {
            student.codespace.status = resolved;
            if resolved == CodespaceStatus::Stopped {
                student.codespace.url.clear();
            }
            self.store.write(&student).await?;
        }

        Ok(resolved)
    }

    pub async fn get_url(&self, sid: &str) -> Result<CodespaceUrl, ControllerError> {
        let status = self.get_status(sid).await?;
        match status {
            CodespaceStatus::Stopped | CodespaceStatus::Failed | CodespaceStatus::Deleted => {
                Ok(CodespaceUrl::None)
            }
            CodespaceStatus::Starting => Ok(CodespaceUrl::Pending),
            CodespaceStatus::Running => {
                let mut student = self.store.read(sid).await.map_err(|e| ControllerError::from_store(sid, e))?;
                if !student.codespace.url.is_empty() {
                    return Ok(CodespaceUrl::Ready(student.codespace.url));
                }
                let info = self.orchestrator.info(&workload_name(sid)).await?;
                student.codespace.url = info.service_url.clone();
                self.store.write(&student).await?;
                Ok(CodespaceUrl::Ready(info.service_url))
            }
        }
    }

    /// Updates `last_active` only. Does not touch `time_used`,
    /// `status`, or the orchestrator.
    pub async fn keep_alive(&self, sid: &str) -> Result<(), ControllerError> {
        let mut student = self.store.read(sid).await.map_err(|e| ControllerError::from_store(sid, e))?;
        student.codespace.last_active = Utc::now().timestamp();
        self.store.write(&student).await?;
        Ok(())
    }

    pub async fn release(&self, sid: &str) -> Result<(), ControllerError> {
        self.orchestrator.release(&workload_name(sid)).await?;
        Ok(())
    }

    async fn tick(&self, sid: &str) -> Result<(), ControllerError> {
        let _guard = self.locks.lock(sid).await;
        let mut student = self.store.read(sid).await.map_err(|e| ControllerError::from_store(sid, e))?;

        if student.codespace.status != CodespaceStatus::Running {
            return Ok(());
        }

        let now = Utc::now().timestamp();
        let base = student.codespace.last_start.max(student.codespace.last_watch);
        let elapsed = (now - base).max(0);

        if student.codespace.time_quota > 0 && elapsed + student.codespace.time_used >= student.codespace.time_quota
        {
            return self.stop_locked(sid, &mut student).await;
        }

        student.codespace.time_used += now - student.codespace.last_watch;
        student.codespace.last_watch = now;
        self.store.write(&student).await?;
        Ok(())
    }

    /// Snapshots the id list and ticks every student, bounding
    /// concurrency so a large roster cannot overwhelm the
    /// orchestrator with simultaneous status checks.
    pub async fn watch_all(&self, concurrency: usize) -> Result<Vec<(String, Result<(), ControllerError>)>, ControllerError> {
        let ids = self.store.all_ids().await?;
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let results = futures::future::join_all(ids.into_iter().map(|sid| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                let result = self.tick(&sid).await;
                (sid, result)
            }
        }))
        .await;

        Ok(results)
    }
}
