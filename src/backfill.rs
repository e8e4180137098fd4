//! Chunked, fault-tolerant fetch → normalise → upsert pipeline.
//!
//! Dates are processed in fixed-size chunks. Fetches inside a chunk run
//! concurrently on the current task and are joined before the chunk's rows are
//! committed in a single upsert. Chunks never overlap. A failed date or a
//! failed commit is logged and the run moves on, so re-running over the same
//! window converges on the same stored state.

use crate::core::config::BackfillConfig;
use crate::core::rates::{LatestRates, RateSnapshot};
use crate::core::source::{FetchOutcome, RateDate, RateSource};
use crate::core::store::RateStore;
use anyhow::{Context, Result, anyhow, ensure};
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use indicatif::ProgressBar;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillRequest {
    pub dates: Vec<NaiveDate>,
    pub chunk_size: usize,
    pub inter_chunk_delay: Duration,
}

impl BackfillRequest {
    pub fn new(dates: Vec<NaiveDate>, chunk_size: usize, inter_chunk_delay: Duration) -> Result<Self> {
        ensure!(chunk_size > 0, "chunk size must be at least 1");
        Ok(Self {
            dates,
            chunk_size,
            inter_chunk_delay,
        })
    }

    pub fn from_config(dates: Vec<NaiveDate>, config: &BackfillConfig) -> Result<Self> {
        Self::new(dates, config.chunk_size, config.delay())
    }
}

/// Counters for one backfill run. `stored + skipped + uncommitted == requested`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub requested: usize,
    pub chunks: usize,
    /// Rows in commits that succeeded
    pub stored: usize,
    /// Dates that produced no snapshot
    pub skipped: usize,
    /// Rows in commits that failed
    pub uncommitted: usize,
    pub failed_chunks: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestReport {
    pub snapshot: RateSnapshot,
    pub cache_updated: bool,
    pub history_updated: bool,
}

pub struct BackfillEngine<'a> {
    source: &'a dyn RateSource,
    store: &'a dyn RateStore,
    base: &'a str,
    progress: Option<ProgressBar>,
}

impl<'a> BackfillEngine<'a> {
    pub fn new(source: &'a dyn RateSource, store: &'a dyn RateStore, base: &'a str) -> Self {
        Self {
            source,
            store,
            base,
            progress: None,
        }
    }

    /// Ticks `progress` once per processed date.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn run(&self, request: &BackfillRequest) -> BackfillReport {
        let mut report = BackfillReport {
            requested: request.dates.len(),
            ..Default::default()
        };
        if let (Some(first), Some(last)) = (request.dates.first(), request.dates.last()) {
            info!(
                "Target: {} days (from {} to {})",
                request.dates.len(),
                first,
                last
            );
        }

        let chunk_size = request.chunk_size.max(1);
        let total_chunks = request.dates.len().div_ceil(chunk_size);
        for (index, chunk) in request.dates.chunks(chunk_size).enumerate() {
            let chunk_no = index + 1;
            report.chunks += 1;

            let fetches = chunk.iter().map(|date| self.fetch_snapshot(*date));
            let rows: Vec<RateSnapshot> = join_all(fetches).await.into_iter().flatten().collect();
            report.skipped += chunk.len() - rows.len();

            if !rows.is_empty() {
                match self.store.upsert_history(&rows).await {
                    Ok(()) => {
                        info!(chunk = chunk_no, rows = rows.len(), "Saved rows");
                        report.stored += rows.len();
                    }
                    Err(e) => {
                        error!(chunk = chunk_no, rows = rows.len(), error = %e, "History upsert failed");
                        report.uncommitted += rows.len();
                        report.failed_chunks += 1;
                    }
                }
            }

            if chunk_no < total_chunks && !request.inter_chunk_delay.is_zero() {
                tokio::time::sleep(request.inter_chunk_delay).await;
            }
        }

        info!(
            stored = report.stored,
            skipped = report.skipped,
            uncommitted = report.uncommitted,
            "Backfill complete"
        );
        report
    }

    /// Fetches and normalises one date. `None` means "no data for this date".
    async fn fetch_snapshot(&self, date: NaiveDate) -> Option<RateSnapshot> {
        let snapshot = match self.source.fetch(RateDate::Day(date)).await {
            FetchOutcome::Payload(payload) => {
                match RateSnapshot::from_payload(date, self.base, &payload) {
                    Ok(snapshot) => {
                        info!(%date, rates = snapshot.rates.len(), "Fetched");
                        Some(snapshot)
                    }
                    Err(e) => {
                        warn!(%date, error = %e, "Skipping unusable payload");
                        None
                    }
                }
            }
            FetchOutcome::NotAvailable => {
                warn!(%date, "No rates published");
                None
            }
            FetchOutcome::TransientError(reason) => {
                warn!(%date, error = %reason, "Failed to fetch");
                None
            }
        };
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
        snapshot
    }

    /// Refreshes the latest-rates cache and today's history row from the
    /// `latest` alias.
    pub async fn update_latest(&self) -> Result<LatestReport> {
        self.update_latest_at(Utc::now()).await
    }

    /// [`Self::update_latest`] with an explicit clock. Neither sink is touched
    /// when the fetch fails; otherwise both upserts are attempted.
    pub async fn update_latest_at(&self, now: DateTime<Utc>) -> Result<LatestReport> {
        info!("Updating latest FX rates...");
        let payload = match self.source.fetch(RateDate::Latest).await {
            FetchOutcome::Payload(payload) => payload,
            FetchOutcome::NotAvailable => return Err(anyhow!("Failed to fetch rates: not available")),
            FetchOutcome::TransientError(reason) => {
                return Err(anyhow!("Failed to fetch rates: {reason}"));
            }
        };

        let snapshot = RateSnapshot::from_payload(now.date_naive(), self.base, &payload)
            .context("Failed to normalise latest rates")?;

        let cache_row = LatestRates {
            base: snapshot.base.clone(),
            rates: snapshot.rates.clone(),
            last_updated_at: now,
        };
        let cache_updated = match self.store.upsert_latest(&cache_row).await {
            Ok(()) => {
                info!(base = %cache_row.base, "Latest cache updated");
                true
            }
            Err(e) => {
                error!(error = %e, "Latest cache update failed");
                false
            }
        };

        let history_updated = match self.store.upsert_history(std::slice::from_ref(&snapshot)).await {
            Ok(()) => {
                info!(date = %snapshot.date, "History (today) updated");
                true
            }
            Err(e) => {
                error!(date = %snapshot.date, error = %e, "History update failed");
                false
            }
        };

        Ok(LatestReport {
            snapshot,
            cache_updated,
            history_updated,
        })
    }
}
