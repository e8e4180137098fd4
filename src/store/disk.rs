use crate::core::rates::{LatestRates, RateSnapshot};
use crate::core::store::RateStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tokio::task;
use tracing::debug;

/// Local store on a fjall keyspace.
///
/// History rows live in the `history` partition under `"{date}|{base}"`, the
/// latest-rates row in `latest` under the base code. Values are JSON. Inserting
/// an existing key replaces it, which gives upsert semantics for free.
pub struct DiskStore {
    keyspace: Keyspace,
    history: PartitionHandle,
    latest: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let history = keyspace.open_partition("history", PartitionCreateOptions::default())?;
        let latest = keyspace.open_partition("latest", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            history,
            latest,
        })
    }

    fn history_key(date: NaiveDate, base: &str) -> String {
        format!("{}|{}", date.format("%Y-%m-%d"), base)
    }

    pub fn history(&self, date: NaiveDate, base: &str) -> Result<Option<RateSnapshot>> {
        match self.history.get(Self::history_key(date, base))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    pub fn latest(&self, base: &str) -> Result<Option<LatestRates>> {
        match self.latest.get(base)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Writes `entries` into `partition` atomically and syncs the journal.
    /// Runs on the blocking pool since the sync is a disk flush.
    async fn write_synced(
        &self,
        partition: &PartitionHandle,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Result<()> {
        let keyspace = self.keyspace.clone();
        let partition = partition.clone();
        task::spawn_blocking(move || -> Result<()> {
            let mut batch = keyspace.batch();
            for (key, value) in entries {
                batch.insert(&partition, key.into_bytes(), value);
            }
            batch.commit().context("Failed to commit batch")?;
            keyspace
                .persist(PersistMode::SyncAll)
                .context("Failed to sync store")?;
            Ok(())
        })
        .await
        .context("Store write task failed")?
    }
}

#[async_trait]
impl RateStore for DiskStore {
    async fn upsert_history(&self, rows: &[RateSnapshot]) -> Result<()> {
        let entries = rows
            .iter()
            .map(|row| -> Result<(String, Vec<u8>)> {
                Ok((Self::history_key(row.date, &row.base), serde_json::to_vec(row)?))
            })
            .collect::<Result<Vec<_>>>()?;
        self.write_synced(&self.history, entries)
            .await
            .context("Failed to write history rows")?;
        debug!(rows = rows.len(), "Disk history PUT");
        Ok(())
    }

    async fn upsert_latest(&self, row: &LatestRates) -> Result<()> {
        let entries = vec![(row.base.clone(), serde_json::to_vec(row)?)];
        self.write_synced(&self.latest, entries)
            .await
            .context("Failed to write latest rates")?;
        debug!(base = %row.base, "Disk latest PUT");
        Ok(())
    }
}
