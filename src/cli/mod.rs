pub mod backfill;
pub mod latest;
pub mod setup;
pub mod ui;
