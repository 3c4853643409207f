use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::LinkError;

/// One shortened URL.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub id: i64,
    pub original_url: String,
    pub short_code: String,
    pub is_custom: bool,
    pub created_at: NaiveDateTime,
}

/// A link about to be inserted.
///
/// `id` is `None` for custom aliases; the store then assigns one itself from
/// the same sequence that feeds generated codes.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub id: Option<i64>,
    pub original_url: String,
    pub short_code: String,
    pub is_custom: bool,
}

/// One resolved redirect. Append-only; never updated or deleted.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub id: i64,
    pub link_id: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub device: String,
    pub browser: String,
    pub clicked_at: NaiveDateTime,
}

/// A click about to be appended.
#[derive(Debug, Clone)]
pub struct NewClick {
    pub link_id: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub device: String,
    pub browser: String,
    pub clicked_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ClickByBrowser {
    pub browser: String,
    pub clicks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ClickByDevice {
    pub device: String,
    pub clicks: i64,
}

/// Click count for one day or month bucket. Month buckets are dated on the
/// first of the month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickByDate {
    pub date: NaiveDate,
    pub clicks: i64,
}

/// Everything the analytics endpoint reports for one short code.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total_clicks: i64,
    pub clicks_by_browser: Vec<ClickByBrowser>,
    pub clicks_by_device: Vec<ClickByDevice>,
    pub recent_clicks: Vec<ClickByDate>,
}

/// Bucket width for recent-click histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Day,
    Month,
}

impl Interval {
    /// Truncate a timestamp to the start of its bucket.
    pub fn truncate(self, at: NaiveDateTime) -> NaiveDate {
        let date = at.date();
        match self {
            Interval::Day => date,
            Interval::Month => date.with_day0(0).unwrap_or(date),
        }
    }

    /// How a bucket date is rendered in API responses.
    pub fn display_format(self) -> &'static str {
        match self {
            Interval::Day => "%Y-%m-%d",
            Interval::Month => "%Y-%m",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Month => "month",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Interval::Day),
            "month" => Ok(Interval::Month),
            other => Err(LinkError::InvalidInterval(other.to_owned())),
        }
    }
}
