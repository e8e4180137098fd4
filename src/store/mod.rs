pub mod disk;
pub mod memory;
pub mod supabase;

use crate::core::config::{AppConfig, StoreConfig};
use crate::core::store::RateStore;
use anyhow::Result;
use disk::DiskStore;
use supabase::SupabaseStore;
use tracing::debug;

/// Opens the store selected by `store.kind`.
pub fn open(config: &AppConfig) -> Result<Box<dyn RateStore>> {
    match &config.store {
        StoreConfig::Supabase(supabase) => {
            debug!(url = supabase.url(), "Using Supabase store");
            Ok(Box::new(SupabaseStore::from_config(
                supabase,
                config.source.timeout(),
            )?))
        }
        StoreConfig::Disk(disk) => {
            let path = AppConfig::disk_path(disk)?;
            debug!(path = %path.display(), "Using disk store");
            Ok(Box::new(DiskStore::open(&path)?))
        }
    }
}
