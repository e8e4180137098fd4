//! Rate snapshots and normalisation of raw API payloads.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Raw JSON object as published by the rate API.
pub type RawPayload = Map<String, Value>;

/// Upper-cased currency code to rate against the base currency.
pub type Rates = BTreeMap<String, f64>;

/// One calendar day's rate table for a base currency. Row of the history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub date: NaiveDate,
    pub base: String,
    pub rates: Rates,
}

impl RateSnapshot {
    pub fn from_payload(date: NaiveDate, base: &str, payload: &RawPayload) -> Result<Self> {
        Ok(Self {
            date,
            base: base.to_string(),
            rates: normalize_rates(payload, base)?,
        })
    }
}

/// Row of the latest-rates cache, keyed by base currency only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestRates {
    pub base: String,
    pub rates: Rates,
    pub last_updated_at: DateTime<Utc>,
}

/// Extracts the `<base>` object from `payload` and cleans it up.
///
/// Keys are upper-cased and entries that are not positive numbers are dropped
/// (the API publishes `0` when it has no data for a currency). When two keys
/// fold to the same code, the one appearing later in the payload wins.
pub fn normalize_rates(payload: &RawPayload, base: &str) -> Result<Rates> {
    let key = base.to_lowercase();
    let quoted = payload
        .get(&key)
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("Payload has no `{key}` rate object"))?;

    let mut rates = Rates::new();
    for (code, value) in quoted {
        match value.as_f64() {
            Some(rate) if rate.is_finite() && rate > 0.0 => {
                rates.insert(code.to_uppercase(), rate);
            }
            Some(rate) => debug!(currency = %code, rate, "Dropping non-positive rate"),
            None => debug!(currency = %code, "Dropping non-numeric rate"),
        }
    }
    Ok(rates)
}
