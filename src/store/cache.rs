use std::sync::Arc;

use tracing::{debug, info, warn};

use super::RecordStore;
use crate::error::{InsightsError, Result};
use crate::models::{CallRecord, LookupStrategy, NormalizedInsights, RecordKey, RecordUpdate};

/// A record together with the key that found it
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub key: RecordKey,
    pub record: CallRecord,
}

impl ResolvedRecord {
    /// Key used when writing back: the record's own preferred key, else the lookup key
    pub fn write_key(&self) -> RecordKey {
        self.record.write_key().unwrap_or_else(|| self.key.clone())
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(NormalizedInsights),
    Miss(ResolvedRecord),
}

/// Insights cache on top of the call record store
#[derive(Clone)]
pub struct InsightsCache {
    store: Arc<dyn RecordStore>,
    strategy: LookupStrategy,
}

impl InsightsCache {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_strategy(store, LookupStrategy::default())
    }

    pub fn with_strategy(store: Arc<dyn RecordStore>, strategy: LookupStrategy) -> Self {
        Self { store, strategy }
    }

    pub fn strategy(&self) -> LookupStrategy {
        self.strategy
    }

    /// Find the record `identifier` names, trying each key in precedence order.
    ///
    /// Store failures stop the search; only an empty result falls through.
    pub async fn resolve(&self, identifier: &str) -> Result<ResolvedRecord> {
        for key in self.strategy.candidates(identifier) {
            debug!("Looking up call record by {}", key);
            if let Some(record) = self.store.get(&key).await? {
                return Ok(ResolvedRecord { key, record });
            }
        }

        Err(InsightsError::CallNotFound {
            call_id: identifier.to_string(),
        })
    }

    /// Cached insights for `identifier`, or the record to compute them from
    pub async fn get(&self, identifier: &str) -> Result<CacheLookup> {
        let resolved = self.resolve(identifier).await?;
        match resolved.record.cached_insights() {
            Some(insights) => {
                info!("Cache hit for call {} via {}", identifier, resolved.key);
                Ok(CacheLookup::Hit(insights))
            }
            None => {
                debug!("Cache miss for call {}", identifier);
                Ok(CacheLookup::Miss(resolved))
            }
        }
    }

    /// Store insights on the record. Best effort: failures are logged and reported as `false`.
    pub async fn put(&self, resolved: &ResolvedRecord, insights: &NormalizedInsights) -> bool {
        let key = resolved.write_key();
        let update = RecordUpdate::now(insights.clone());

        match self.store.update(&key, &update).await {
            Ok(()) => {
                info!("Cached insights on record {}", key);
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to cache insights on record {}", key);
                false
            }
        }
    }
}
