use crate::core::config::SupabaseConfig;
use crate::core::rates::{LatestRates, RateSnapshot};
use crate::core::store::RateStore;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=minimal";

/// Upserts rows through the Supabase (PostgREST) REST API.
pub struct SupabaseStore {
    client: reqwest::Client,
    rest_url: String,
    service_role_key: String,
    history_table: String,
    latest_table: String,
}

impl SupabaseStore {
    pub fn new(
        url: &str,
        service_role_key: &str,
        history_table: &str,
        latest_table: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxseed/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(SupabaseStore {
            client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            service_role_key: service_role_key.to_string(),
            history_table: history_table.to_string(),
            latest_table: latest_table.to_string(),
        })
    }

    pub fn from_config(config: &SupabaseConfig, timeout: Duration) -> Result<Self> {
        let key = config
            .service_role_key
            .as_deref()
            .context("Missing Supabase service role key")?;
        let url = config.url().context("Missing Supabase URL")?;
        Self::new(
            url,
            key,
            &config.history_table,
            &config.latest_table,
            timeout,
        )
    }

    async fn upsert<T: Serialize + ?Sized + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &T,
    ) -> Result<()> {
        let url = format!("{}/{}?on_conflict={}", self.rest_url, table, on_conflict);
        debug!("Upserting into {}", url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .header("Prefer", MERGE_DUPLICATES)
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for table: {}", e, table))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "HTTP error: {} upserting into {}: {}",
                status,
                table,
                body
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RateStore for SupabaseStore {
    #[instrument(name = "SupabaseHistoryUpsert", skip_all, fields(rows = rows.len()))]
    async fn upsert_history(&self, rows: &[RateSnapshot]) -> Result<()> {
        self.upsert(&self.history_table, "date,base", rows).await
    }

    #[instrument(name = "SupabaseLatestUpsert", skip_all, fields(base = %row.base))]
    async fn upsert_latest(&self, row: &LatestRates) -> Result<()> {
        self.upsert(&self.latest_table, "base", row).await
    }
}
