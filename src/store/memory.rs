use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::RecordStore;
use crate::error::{InsightsError, Result};
use crate::models::{CallRecord, RecordKey, RecordUpdate};

/// In-process record store
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<CallRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CallRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Default::default()
        }
    }

    pub async fn insert(&self, record: CallRecord) {
        self.records.write().await.push(record);
    }

    /// Copy of every stored record
    pub async fn records(&self) -> Vec<CallRecord> {
        self.records.read().await.clone()
    }

    /// Make every read fail with a store error
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with a store error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<CallRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(InsightsError::RecordStore(format!("read of {} failed", key)));
        }
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.matches(key)).cloned())
    }

    async fn update(&self, key: &RecordKey, update: &RecordUpdate) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(InsightsError::RecordStore(format!("write to {} failed", key)));
        }

        let insights = serde_json::to_value(&update.insights)
            .map_err(|e| InsightsError::RecordStore(format!("failed to encode insights: {}", e)))?;

        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.matches(key))
            .ok_or_else(|| InsightsError::RecordStore(format!("no record matched {}", key)))?;
        record.insights = Some(insights);
        record.processed_at = Some(update.processed_at);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
