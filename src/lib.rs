//! snaplink: URL shortener with a read-through cache whose TTL follows
//! each code's recent popularity, plus per-click analytics.

pub mod analytics;
pub mod cache;
pub mod config;
pub mod db;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod ttl;
pub mod useragent;
pub mod validate;

pub use engine::LinkEngine;
pub use error::LinkError;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub engine: LinkEngine,
    pub config: config::AppConfig,
}
