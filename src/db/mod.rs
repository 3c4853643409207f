//! Durable store: the source of truth for links and clicks.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{ClickByBrowser, ClickByDate, ClickByDevice, Interval, NewClick, NewLink},
};

/// Everything the engine needs from persistent storage.
///
/// Implementations must be safe for unbounded concurrent use. Each call is
/// one logical operation; the engine never holds a connection across calls.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Draw the next value from the monotonic id sequence. A drawn value is
    /// never handed out again, even if nothing is inserted with it.
    async fn next_sequence_value(&self) -> Result<i64, StoreError>;

    /// Insert a link. Fails with [`StoreError::Duplicate`] if the short code
    /// is already taken.
    async fn create_link(&self, link: &NewLink) -> Result<(), StoreError>;

    async fn get_url_by_code(&self, code: &str) -> Result<Option<String>, StoreError>;

    async fn get_id_by_code(&self, code: &str) -> Result<Option<i64>, StoreError>;

    async fn exists_by_code(&self, code: &str) -> Result<bool, StoreError>;

    async fn create_click(&self, click: &NewClick) -> Result<(), StoreError>;

    async fn total_clicks(&self, code: &str) -> Result<i64, StoreError>;

    /// Highest count first.
    async fn clicks_by_browser(&self, code: &str) -> Result<Vec<ClickByBrowser>, StoreError>;

    /// Highest count first.
    async fn clicks_by_device(&self, code: &str) -> Result<Vec<ClickByDevice>, StoreError>;

    /// At most the 90 latest buckets, ascending by date.
    async fn recent_clicks(
        &self,
        code: &str,
        interval: Interval,
    ) -> Result<Vec<ClickByDate>, StoreError>;
}
