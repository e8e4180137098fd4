//! Core domain types and the seams between fetching and storing.

pub mod config;
pub mod log;
pub mod rates;
pub mod source;
pub mod store;
pub mod window;

// Re-export main types for cleaner imports
pub use rates::{LatestRates, RateSnapshot, Rates, RawPayload};
pub use source::{FetchOutcome, RateDate, RateSource};
pub use store::RateStore;
