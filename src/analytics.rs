//! Click analytics for a single short code.
//!
//! [`Analytics`] is the read path used by the engine: every query first
//! checks the code exists, then asks the store for one aggregate. The free
//! functions below do the same grouping over raw [`ClickEvent`]s and back the
//! in-process store.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{
    db::LinkStore,
    error::LinkError,
    models::{AnalyticsSummary, ClickByBrowser, ClickByDate, ClickByDevice, ClickEvent, Interval},
};

/// Number of date buckets a recent-clicks query returns at most.
pub const MAX_RECENT_BUCKETS: usize = 90;

#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn LinkStore>,
}

impl Analytics {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    pub async fn total_clicks(&self, code: &str) -> Result<i64, LinkError> {
        self.ensure_exists(code).await?;
        Ok(self.store.total_clicks(code).await?)
    }

    /// Browsers ordered by click count, busiest first.
    pub async fn clicks_by_browser(&self, code: &str) -> Result<Vec<ClickByBrowser>, LinkError> {
        self.ensure_exists(code).await?;
        Ok(self.store.clicks_by_browser(code).await?)
    }

    /// Device classes ordered by click count, busiest first.
    pub async fn clicks_by_device(&self, code: &str) -> Result<Vec<ClickByDevice>, LinkError> {
        self.ensure_exists(code).await?;
        Ok(self.store.clicks_by_device(code).await?)
    }

    /// The most recent [`MAX_RECENT_BUCKETS`] buckets, oldest first.
    pub async fn recent_clicks(
        &self,
        code: &str,
        interval: Interval,
    ) -> Result<Vec<ClickByDate>, LinkError> {
        self.ensure_exists(code).await?;
        Ok(self.store.recent_clicks(code, interval).await?)
    }

    /// Total, browser and device breakdowns, and daily recent clicks.
    ///
    /// Each part is its own query, so under concurrent writes the parts may
    /// disagree by a few clicks.
    pub async fn full(&self, code: &str) -> Result<AnalyticsSummary, LinkError> {
        Ok(AnalyticsSummary {
            total_clicks: self.total_clicks(code).await?,
            clicks_by_browser: self.clicks_by_browser(code).await?,
            clicks_by_device: self.clicks_by_device(code).await?,
            recent_clicks: self.recent_clicks(code, Interval::Day).await?,
        })
    }

    async fn ensure_exists(&self, code: &str) -> Result<(), LinkError> {
        if self.store.exists_by_code(code).await? {
            Ok(())
        } else {
            Err(LinkError::NotFound)
        }
    }
}

// ── Grouping helpers ───────────────────────────────────────────────────────

/// Count clicks per key, highest count first. Ties keep first-seen order.
pub fn count_by<'a, I, F>(clicks: I, key: F) -> Vec<(String, i64)>
where
    I: IntoIterator<Item = &'a ClickEvent>,
    F: Fn(&ClickEvent) -> &str,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, i64)> = Vec::new();

    for click in clicks {
        let k = key(click);
        match index.get(k) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(k, counts.len());
                counts.push((k.to_owned(), 1));
            }
        }
    }

    // sort_by is stable, so equal counts stay in insertion order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

pub fn browser_counts<'a, I>(clicks: I) -> Vec<ClickByBrowser>
where
    I: IntoIterator<Item = &'a ClickEvent>,
{
    count_by(clicks, |c| c.browser.as_str())
        .into_iter()
        .map(|(browser, clicks)| ClickByBrowser { browser, clicks })
        .collect()
}

pub fn device_counts<'a, I>(clicks: I) -> Vec<ClickByDevice>
where
    I: IntoIterator<Item = &'a ClickEvent>,
{
    count_by(clicks, |c| c.device.as_str())
        .into_iter()
        .map(|(device, clicks)| ClickByDevice { device, clicks })
        .collect()
}

/// Bucket clicks by day or month and keep the latest [`MAX_RECENT_BUCKETS`],
/// returned in ascending date order.
pub fn bucket_counts<'a, I>(clicks: I, interval: Interval) -> Vec<ClickByDate>
where
    I: IntoIterator<Item = &'a ClickEvent>,
{
    let mut buckets = BTreeMap::new();
    for click in clicks {
        *buckets.entry(interval.truncate(click.clicked_at)).or_insert(0i64) += 1;
    }

    let skip = buckets.len().saturating_sub(MAX_RECENT_BUCKETS);
    buckets
        .into_iter()
        .skip(skip)
        .map(|(date, clicks)| ClickByDate { date, clicks })
        .collect()
}
