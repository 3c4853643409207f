use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};

use super::LinkStore;
use crate::{
    analytics,
    error::StoreError,
    models::{
        ClickByBrowser, ClickByDate, ClickByDevice, ClickEvent, Interval, LinkRecord, NewClick,
        NewLink,
    },
};

/// In-process store backed by DashMap.
///
/// Behaves like [`SqliteStore`](super::SqliteStore) but loses everything on
/// restart. Useful for local runs (`DATABASE_URL=memory`) and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sequence: AtomicI64,
    click_ids: AtomicI64,
    links: DashMap<String, LinkRecord>,
    /// link id -> clicks, in insertion order
    clicks: DashMap<i64, Vec<ClickEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn draw_id(&self) -> i64 {
        self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run `f` over the clicks of `code`, or over nothing if the code is
    /// unknown. The shard lock is held for the duration, so `f` sees one
    /// consistent snapshot.
    fn with_clicks<T>(&self, code: &str, f: impl FnOnce(&[ClickEvent]) -> T) -> T {
        let link_id = self.inner.links.get(code).map(|l| l.id);
        match link_id.and_then(|id| self.inner.clicks.get(&id)) {
            Some(clicks) => f(clicks.as_slice()),
            None => f(&[]),
        }
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn next_sequence_value(&self) -> Result<i64, StoreError> {
        Ok(self.draw_id())
    }

    async fn create_link(&self, link: &NewLink) -> Result<(), StoreError> {
        match self.inner.links.entry(link.short_code.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                let id = link.id.unwrap_or_else(|| self.draw_id());
                slot.insert(LinkRecord {
                    id,
                    original_url: link.original_url.clone(),
                    short_code: link.short_code.clone(),
                    is_custom: link.is_custom,
                    created_at: Utc::now().naive_utc(),
                });
                Ok(())
            }
        }
    }

    async fn get_url_by_code(&self, code: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.links.get(code).map(|l| l.original_url.clone()))
    }

    async fn get_id_by_code(&self, code: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.inner.links.get(code).map(|l| l.id))
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.inner.links.contains_key(code))
    }

    async fn create_click(&self, click: &NewClick) -> Result<(), StoreError> {
        let id = self.inner.click_ids.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .clicks
            .entry(click.link_id)
            .or_default()
            .push(ClickEvent {
                id,
                link_id: click.link_id,
                ip_address: click.ip_address.clone(),
                user_agent: click.user_agent.clone(),
                device: click.device.clone(),
                browser: click.browser.clone(),
                clicked_at: click.clicked_at,
            });
        Ok(())
    }

    async fn total_clicks(&self, code: &str) -> Result<i64, StoreError> {
        Ok(self.with_clicks(code, |clicks| clicks.len() as i64))
    }

    async fn clicks_by_browser(&self, code: &str) -> Result<Vec<ClickByBrowser>, StoreError> {
        Ok(self.with_clicks(code, |clicks| analytics::browser_counts(clicks)))
    }

    async fn clicks_by_device(&self, code: &str) -> Result<Vec<ClickByDevice>, StoreError> {
        Ok(self.with_clicks(code, |clicks| analytics::device_counts(clicks)))
    }

    async fn recent_clicks(
        &self,
        code: &str,
        interval: Interval,
    ) -> Result<Vec<ClickByDate>, StoreError> {
        Ok(self.with_clicks(code, |clicks| analytics::bucket_counts(clicks, interval)))
    }
}
