//! Link creation, cached resolution and click recording.
//!
//! The engine owns no mutable state of its own. Everything shared lives in
//! the injected store and cache, so one `LinkEngine` can be cloned into every
//! request handler.

use std::{sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    analytics::Analytics,
    cache::Cache,
    db::LinkStore,
    encoder,
    error::{LinkError, StoreError},
    models::{AnalyticsSummary, ClickByBrowser, ClickByDate, ClickByDevice, Interval, NewClick, NewLink},
    ttl,
    useragent::UserAgentClassifier,
};

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn url_key(code: &str) -> String {
    format!("url:{code}")
}

fn hits_1h_key(code: &str) -> String {
    format!("hits:1h:{code}")
}

fn hits_24h_key(code: &str) -> String {
    format!("hits:24h:{code}")
}

#[derive(Clone)]
pub struct LinkEngine {
    store: Arc<dyn LinkStore>,
    cache: Arc<dyn Cache>,
    classifier: Arc<dyn UserAgentClassifier>,
    analytics: Analytics,
}

impl LinkEngine {
    pub fn new(
        store: Arc<dyn LinkStore>,
        cache: Arc<dyn Cache>,
        classifier: Arc<dyn UserAgentClassifier>,
    ) -> Self {
        let analytics = Analytics::new(store.clone());
        Self {
            store,
            cache,
            classifier,
            analytics,
        }
    }

    // ── Creation ───────────────────────────────────────────────────────────

    /// Store `original_url` and return its short code.
    ///
    /// Inputs are assumed already validated. With a custom alias the alias
    /// becomes the code; otherwise the next sequence value is base62-encoded.
    pub async fn create_short_url(
        &self,
        original_url: &str,
        custom_alias: Option<&str>,
    ) -> Result<String, LinkError> {
        match custom_alias {
            Some(alias) => self.create_custom(original_url, alias).await,
            None => self.create_generated(original_url).await,
        }
    }

    async fn create_custom(&self, original_url: &str, alias: &str) -> Result<String, LinkError> {
        if self.store.exists_by_code(alias).await? {
            return Err(LinkError::AliasTaken);
        }

        let link = NewLink {
            id: None,
            original_url: original_url.to_owned(),
            short_code: alias.to_owned(),
            is_custom: true,
        };

        // A concurrent creation can still win between the probe and the
        // insert; the unique constraint catches that.
        match self.store.create_link(&link).await {
            Ok(()) => Ok(link.short_code),
            Err(StoreError::Duplicate) => Err(LinkError::AliasTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_generated(&self, original_url: &str) -> Result<String, LinkError> {
        let id = self.store.next_sequence_value().await?;
        let seq = u64::try_from(id)
            .map_err(|_| StoreError::Corrupt(format!("negative sequence value {id}")))?;

        let link = NewLink {
            id: Some(id),
            original_url: original_url.to_owned(),
            short_code: encoder::encode(seq),
            is_custom: false,
        };

        // If this fails the id is simply skipped; it is never reused.
        self.store.create_link(&link).await?;
        Ok(link.short_code)
    }

    // ── Resolution ─────────────────────────────────────────────────────────

    /// Look up the original URL for `short_code`, cache first.
    ///
    /// Cache trouble of any kind only costs latency: it is logged and the
    /// store is asked instead.
    pub async fn resolve(&self, short_code: &str) -> Result<String, LinkError> {
        let key = url_key(short_code);

        match self.cache.get(&key).await {
            Ok(Some(url)) => {
                tracing::debug!("cache hit for '{}'", short_code);
                self.record_hit(short_code).await;
                return Ok(url);
            }
            Ok(None) => tracing::debug!("cache miss for '{}'", short_code),
            Err(e) => tracing::warn!("cache read failed for '{}': {}", short_code, e),
        }

        let url = self
            .store
            .get_url_by_code(short_code)
            .await?
            .ok_or(LinkError::NotFound)?;

        let ttl = self.cache_ttl(short_code).await;
        if let Err(e) = self.cache.set(&key, &url, ttl).await {
            tracing::warn!("cache write failed for '{}': {}", short_code, e);
        }

        Ok(url)
    }

    /// Bump both hit windows. Failures are logged and otherwise ignored.
    async fn record_hit(&self, short_code: &str) {
        let (key_1h, key_24h) = (hits_1h_key(short_code), hits_24h_key(short_code));
        let (hour, day) = tokio::join!(
            self.cache.increment_with_expiry(&key_1h, HOUR),
            self.cache.increment_with_expiry(&key_24h, DAY),
        );

        for (key, result) in [(key_1h, hour), (key_24h, day)] {
            if let Err(e) = result {
                tracing::warn!("hit counter '{}' not updated: {}", key, e);
            }
        }
    }

    /// TTL for a freshly resolved URL, sized by its recent hit counts.
    async fn cache_ttl(&self, short_code: &str) -> Duration {
        let (hits_1h, hits_24h) = tokio::join!(
            self.read_counter(hits_1h_key(short_code)),
            self.read_counter(hits_24h_key(short_code)),
        );
        let ttl = ttl::ttl_for_hits(hits_1h, hits_24h);
        tracing::debug!(
            "ttl for '{}' is {:?} (1h={}, 24h={})",
            short_code,
            ttl,
            hits_1h,
            hits_24h
        );
        ttl
    }

    /// Missing counters are zero; unreadable ones are logged and also zero.
    async fn read_counter(&self, key: String) -> i64 {
        match self.cache.get_int(&key).await {
            Ok(count) => count.unwrap_or(0),
            Err(e) => {
                tracing::warn!("hit counter '{}' unreadable: {}", key, e);
                0
            }
        }
    }

    // ── Clicks ─────────────────────────────────────────────────────────────

    /// Record one click on `short_code`. Does not touch the cache.
    pub async fn track_click(
        &self,
        short_code: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<(), LinkError> {
        let link_id = self
            .store
            .get_id_by_code(short_code)
            .await?
            .ok_or(LinkError::NotFound)?;

        let client = self.classifier.classify(user_agent);

        let click = NewClick {
            link_id,
            ip_address: ip.to_owned(),
            user_agent: user_agent.to_owned(),
            device: client.device,
            browser: client.browser,
            clicked_at: Utc::now().naive_utc(),
        };

        self.store.create_click(&click).await?;
        Ok(())
    }

    pub async fn exists_by_short_code(&self, short_code: &str) -> Result<(), LinkError> {
        if self.store.exists_by_code(short_code).await? {
            Ok(())
        } else {
            Err(LinkError::NotFound)
        }
    }

    // ── Analytics ──────────────────────────────────────────────────────────

    pub async fn analytics(&self, short_code: &str) -> Result<AnalyticsSummary, LinkError> {
        self.analytics.full(short_code).await
    }

    pub async fn total_clicks(&self, short_code: &str) -> Result<i64, LinkError> {
        self.analytics.total_clicks(short_code).await
    }

    /// `interval` must be `"day"` or `"month"`; anything else is rejected
    /// before the store is consulted.
    pub async fn recent_clicks(
        &self,
        short_code: &str,
        interval: &str,
    ) -> Result<Vec<ClickByDate>, LinkError> {
        let interval: Interval = interval.parse()?;
        self.analytics.recent_clicks(short_code, interval).await
    }

    pub async fn clicks_by_browser(&self, short_code: &str) -> Result<Vec<ClickByBrowser>, LinkError> {
        self.analytics.clicks_by_browser(short_code).await
    }

    pub async fn clicks_by_device(&self, short_code: &str) -> Result<Vec<ClickByDevice>, LinkError> {
        self.analytics.clicks_by_device(short_code).await
    }
}
