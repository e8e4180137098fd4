//! Fetch side of the pipeline: anything that can hand out a raw rate payload
//! for a date.

use crate::core::rates::RawPayload;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;

/// A publication date, or the API's `latest` alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateDate {
    Day(NaiveDate),
    Latest,
}

impl fmt::Display for RateDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateDate::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            RateDate::Latest => f.write_str("latest"),
        }
    }
}

/// Result of a single fetch. Never an `Err`: every failure is folded in here.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Payload(RawPayload),
    /// Nothing was published for this date.
    NotAvailable,
    /// Transport failure, unexpected status, or an unparsable body.
    TransientError(String),
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self, date: RateDate) -> FetchOutcome;
}
