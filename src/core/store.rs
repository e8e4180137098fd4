//! Persistence side of the pipeline.

use crate::core::rates::{LatestRates, RateSnapshot};
use anyhow::Result;
use async_trait::async_trait;

/// Idempotent sink for rate rows. Each call is treated as atomic.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Insert-or-update history rows keyed by `(date, base)`.
    async fn upsert_history(&self, rows: &[RateSnapshot]) -> Result<()>;

    /// Insert-or-update the latest-rates row keyed by `base`.
    async fn upsert_latest(&self, row: &LatestRates) -> Result<()>;
}
