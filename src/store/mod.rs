pub mod cache;
pub mod memory;
pub mod supabase;

pub use cache::*;
pub use memory::*;
pub use supabase::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CallRecord, RecordKey, RecordUpdate};

/// External store holding call records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record `key` names, `None` when there is none
    async fn get(&self, key: &RecordKey) -> Result<Option<CallRecord>>;

    /// Write `update` onto the record `key` names
    async fn update(&self, key: &RecordKey, update: &RecordUpdate) -> Result<()>;
}
