#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("student {0:?} not found")]
    NotFound(String),

    #[error("student {0:?} already exists")]
    AlreadyExists(String),

    #[error("student directory error for {sid:?}: {message}")]
    Directory { sid: String, message: String },

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("password hash error: {0}")]
    PasswordHash(String),

    #[error("{field} {value:?} exceeds the {limit}-byte limit")]
    Oversize { field: &'static str, value: String, limit: usize },
}
