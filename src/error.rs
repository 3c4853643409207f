use thiserror::Error;

/// Failures raised by a [`LinkStore`](crate::db::LinkStore) implementation.
///
/// "Not found" is not an error at this layer: lookups return `Ok(None)`
/// and existence probes return `Ok(false)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store's uniqueness constraint rejected a short code.
    #[error("short code already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row came back in a shape we cannot decode.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Failures raised by a [`Cache`](crate::cache::Cache) implementation.
///
/// The engine never propagates these; they are logged and treated as misses.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("value under '{key}' is not an integer")]
    NotInteger { key: String },
}

/// Outcomes of engine operations that callers are expected to act on.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("short code not found")]
    NotFound,

    #[error("alias already taken")]
    AliasTaken,

    #[error("invalid interval '{0}': must be \"day\" or \"month\"")]
    InvalidInterval(String),

    /// Unexpected failure of the durable store.
    #[error("upstream failure: {0}")]
    Upstream(#[source] StoreError),
}

impl From<StoreError> for LinkError {
    fn from(err: StoreError) -> Self {
        LinkError::Upstream(err)
    }
}
