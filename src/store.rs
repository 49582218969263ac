//! Holds the most recent snapshot and persists it across runs.
//!
//! The published value lives in a `tokio::sync::watch` channel: an
//! atomically swapped immutable snapshot, so observers never see a torn
//! value and each publish is delivered once. On disk, every publish writes
//! both the combined JSON form and the legacy per-rate keys in a single
//! atomic batch, keeping readers of either format working.

use anyhow::{Context, Result};
use chrono::Utc;
use fjall::{Batch, Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::snapshot::RateSnapshot;

const PARTITION: &str = "rates";

const KEY_COMBINED: &str = "last_known_rates_json";
const KEY_BCV: &str = "bcv_value";
const KEY_EURO: &str = "euro_value";
const KEY_BINANCE: &str = "binance_value";
const KEY_SATOSHI: &str = "satoshi_value";
const KEY_TIMESTAMP: &str = "timestamp_key";

pub struct RateStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    tx: watch::Sender<Option<RateSnapshot>>,
}

impl RateStore {
    /// Opens the store and publishes whatever the last run left behind:
    /// the combined snapshot if it parses, else a snapshot synthesized from
    /// the legacy keys, else the explicit no-data state.
    pub fn open(path: &Path) -> Result<Self> {
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open rate store at {}", path.display()))?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;

        let (tx, _rx) = watch::channel(None);
        let store = Self {
            keyspace,
            partition,
            tx,
        };
        let initial = store.load_initial();
        store.tx.send_replace(initial);
        Ok(store)
    }

    /// Current published value. `None` means no snapshot has ever been
    /// captured, which is distinct from an all-absent snapshot.
    pub fn latest(&self) -> Option<RateSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RateSnapshot>> {
        self.tx.subscribe()
    }

    /// Persists and publishes a new snapshot. A persistence failure is
    /// recoverable: observers still receive the in-memory update.
    pub fn publish(&self, snapshot: RateSnapshot) {
        if let Err(e) = self.persist(&snapshot) {
            warn!("Failed to persist snapshot: {e:#}");
        }
        self.tx.send_replace(Some(snapshot));
    }

    fn persist(&self, snapshot: &RateSnapshot) -> Result<()> {
        let json = serde_json::to_vec(snapshot)?;

        let mut batch = self.keyspace.batch();
        batch.insert(&self.partition, KEY_COMBINED, json);
        self.put_legacy(&mut batch, KEY_BCV, snapshot.bcv_rate.as_deref());
        self.put_legacy(&mut batch, KEY_EURO, snapshot.euro_rate.as_deref());
        self.put_legacy(&mut batch, KEY_BINANCE, snapshot.binance_rate.as_deref());
        self.put_legacy(&mut batch, KEY_SATOSHI, snapshot.satoshi_rate.as_deref());
        batch.insert(&self.partition, KEY_TIMESTAMP, snapshot.timestamp.to_string());
        batch.commit()?;
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;

        debug!("Persisted snapshot with timestamp {}", snapshot.timestamp);
        Ok(())
    }

    // Absent rates remove their legacy key, matching how the original
    // preference store treated a null value.
    fn put_legacy(&self, batch: &mut Batch, key: &str, value: Option<&str>) {
        match value {
            Some(value) => batch.insert(&self.partition, key, value),
            None => batch.remove(&self.partition, key),
        }
    }

    fn load_initial(&self) -> Option<RateSnapshot> {
        match self.read_combined() {
            Ok(Some(snapshot)) => {
                debug!("Loaded combined snapshot from store");
                return Some(snapshot);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Could not read combined snapshot, trying legacy keys: {e:#}");
            }
        }
        self.read_legacy()
    }

    fn read_combined(&self) -> Result<Option<RateSnapshot>> {
        let Some(raw) = self.partition.get(KEY_COMBINED)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn read_legacy(&self) -> Option<RateSnapshot> {
        let bcv_rate = self.read_string(KEY_BCV);
        let euro_rate = self.read_string(KEY_EURO);
        let binance_rate = self.read_string(KEY_BINANCE);
        let satoshi_rate = self.read_string(KEY_SATOSHI);

        if bcv_rate.is_none()
            && euro_rate.is_none()
            && binance_rate.is_none()
            && satoshi_rate.is_none()
        {
            debug!("No rate data in store");
            return None;
        }

        let stored = self
            .read_string(KEY_TIMESTAMP)
            .and_then(|raw| raw.parse::<i64>().ok())
            .unwrap_or(0);
        let timestamp = if stored == 0 {
            Utc::now().timestamp_millis()
        } else {
            stored
        };

        debug!("Reconstructed snapshot from legacy keys");
        Some(RateSnapshot {
            bcv_rate,
            euro_rate,
            binance_rate,
            satoshi_rate,
            timestamp,
        })
    }

    fn read_string(&self, key: &str) -> Option<String> {
        self.partition
            .get(key)
            .ok()
            .flatten()
            .and_then(|raw| String::from_utf8(raw.to_vec()).ok())
    }
}
