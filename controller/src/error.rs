#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("student {0:?} not found")]
    NotFound(String),

    #[error("student {0:?} already exists")]
    AlreadyExists(String),

    #[error("codespace quota exceeded for {0:?}")]
    QuotaExceeded(String),

    #[error("failed to start codespace for {sid:?}: {cause}")]
    StartFailed { sid: String, cause: String },

    #[error("failed to stop codespace for {sid:?}: {cause}")]
    StopFailed { sid: String, cause: String },

    #[error(transparent)]
    Store(#[from] codeloom_store::StoreError),

    #[error(transparent)]
    Orchestrator(#[from] codeloom_orchestrator::OrchestratorError),
}

impl ControllerError {
    /// Maps a store lookup miss to the controller's own not-found
    /// variant, leaving other errors untouched.
    pub fn from_store(sid: &str, e: codeloom_store::StoreError) -> Self {
        match e {
            codeloom_store::StoreError::NotFound(_) => Self::NotFound(sid.to_string()),
            other => Self::Store(other),
        }
    }
}
