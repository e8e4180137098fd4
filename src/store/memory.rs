use crate::core::rates::{LatestRates, RateSnapshot, Rates};
use crate::core::store::RateStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory store. Keeps every upsert call around for inspection.
#[derive(Default)]
pub struct MemoryStore {
    history: Mutex<HashMap<(NaiveDate, String), Rates>>,
    latest: Mutex<HashMap<String, LatestRates>>,
    history_calls: Mutex<Vec<Vec<RateSnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn history(&self, date: NaiveDate, base: &str) -> Option<Rates> {
        let history = self.history.lock().await;
        history.get(&(date, base.to_string())).cloned()
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub async fn latest(&self, base: &str) -> Option<LatestRates> {
        self.latest.lock().await.get(base).cloned()
    }

    /// Batches passed to `upsert_history`, in call order.
    pub async fn history_calls(&self) -> Vec<Vec<RateSnapshot>> {
        self.history_calls.lock().await.clone()
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn upsert_history(&self, rows: &[RateSnapshot]) -> Result<()> {
        let mut history = self.history.lock().await;
        for row in rows {
            debug!(date = %row.date, base = %row.base, "Memory history PUT");
            history.insert((row.date, row.base.clone()), row.rates.clone());
        }
        self.history_calls.lock().await.push(rows.to_vec());
        Ok(())
    }

    async fn upsert_latest(&self, row: &LatestRates) -> Result<()> {
        debug!(base = %row.base, "Memory latest PUT");
        self.latest
            .lock()
            .await
            .insert(row.base.clone(), row.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(date: NaiveDate, usd: f64) -> RateSnapshot {
        RateSnapshot {
            date,
            base: "KRW".to_string(),
            rates: Rates::from([("USD".to_string(), usd)]),
        }
    }

    #[tokio::test]
    async fn test_history_upsert_overwrites_same_key() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        store.upsert_history(&[snapshot(date, 0.1)]).await.unwrap();
        store.upsert_history(&[snapshot(date, 0.2)]).await.unwrap();

        assert_eq!(store.history_len().await, 1);
        assert_eq!(store.history(date, "KRW").await.unwrap()["USD"], 0.2);
        assert_eq!(store.history_calls().await.len(), 2);
        assert!(store.history(date, "USD").await.is_none());
    }

    #[tokio::test]
    async fn test_latest_upsert_keyed_by_base() {
        let store = MemoryStore::new();
        let row = LatestRates {
            base: "KRW".to_string(),
            rates: Rates::from([("USD".to_string(), 0.00075)]),
            last_updated_at: Utc::now(),
        };

        store.upsert_latest(&row).await.unwrap();
        let mut newer = row.clone();
        newer.rates.insert("EUR".to_string(), 0.0007);
        store.upsert_latest(&newer).await.unwrap();

        assert_eq!(store.latest("KRW").await, Some(newer));
    }
}
