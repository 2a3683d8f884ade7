//! Discovery source adapters.

pub mod biorxiv;
pub mod feeds;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::PaperRecord;

/// Lookback window and per-source cap handed to every adapter.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryWindow {
    pub now: DateTime<Utc>,
    pub days_lookback: u32,
    pub max_per_source: usize,
}

impl DiscoveryWindow {
    pub fn new(now: DateTime<Utc>, days_lookback: u32, max_per_source: usize) -> Self {
        Self { now, days_lookback, max_per_source }
    }

    /// Oldest instant still inside the window.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(self.days_lookback))
    }

    pub fn start_date(&self) -> NaiveDate {
        self.cutoff().date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Common interface for all discovery adapters.
///
/// Implementations may fail; the pipeline logs the error and treats the
/// source as having produced nothing.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Human label used in logs.
    fn name(&self) -> String;

    /// Produce zero or more records for the window.
    async fn discover(&self, window: &DiscoveryWindow) -> anyhow::Result<Vec<PaperRecord>>;
}
