#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("workload {0:?} not found")]
    NotFound(String),

    #[error("cluster error: {source}")]
    Cluster {
        #[from]
        source: kube::Error,
    },

    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("gave up after {attempts} attempts patching {name:?}: {source}")]
    Conflict {
        name: String,
        attempts: u32,
        #[source]
        source: kube::Error,
    },
}
