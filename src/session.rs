use std::sync::Arc;

use crate::storage::KeyValueStore;

pub const SELECTED_SEED_KEY: &str = "selectedSeedId";
const SELL_QTY_PREFIX: &str = "sellQty_";

pub fn sell_qty_key(crop_id: u64) -> String {
    format!("{SELL_QTY_PREFIX}{crop_id}")
}

/// `min(q, available)` when the available amount is known (> 0), `q` otherwise.
pub fn clamp_to_available(q: u32, available: u32) -> u32 {
    if available > 0 {
        q.min(available)
    } else {
        q
    }
}

/// Per-player view state that outlives a resync: the seed picked for planting and the
/// sell quantity typed for each crop. Backed by a local store; every read and write
/// degrades to "not persisted" when the store fails.
pub struct ViewSession {
    store: Arc<dyn KeyValueStore>,
    selected_seed: Option<String>,
}

impl ViewSession {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let selected_seed = read(store.as_ref(), SELECTED_SEED_KEY).filter(|s| !s.is_empty());
        if let Some(ref seed) = selected_seed {
            tracing::debug!(seed, "restored selected seed");
        }
        Self { store, selected_seed }
    }

    pub fn selected_seed(&self) -> Option<&str> {
        self.selected_seed.as_deref()
    }

    /// Empty or `None` clears the selection.
    pub fn select_seed(&mut self, seed: Option<String>) {
        let seed = seed.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        match &seed {
            Some(s) => write(self.store.as_ref(), SELECTED_SEED_KEY, s),
            None => remove(self.store.as_ref(), SELECTED_SEED_KEY),
        }
        self.selected_seed = seed;
    }

    /// Stored sell quantity for a crop, clamped to what is available. Defaults to 1.
    pub fn sell_quantity(&self, crop_id: u64, available: u32) -> u32 {
        let stored = read(self.store.as_ref(), &sell_qty_key(crop_id))
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|q| *q > 0)
            .unwrap_or(1);
        clamp_to_available(stored, available)
    }

    /// Records an edited sell quantity. Values below 1 snap to 1, values above the available
    /// amount snap to it. Returns what was stored.
    pub fn set_sell_quantity(&self, crop_id: u64, requested: i64, available: u32) -> u32 {
        let q = u32::try_from(requested.max(1)).unwrap_or(u32::MAX);
        let q = clamp_to_available(q, available);
        write(self.store.as_ref(), &sell_qty_key(crop_id), &q.to_string());
        q
    }
}

fn read(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(key, error = %e, "local store read failed");
            None
        }
    }
}

fn write(store: &dyn KeyValueStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        tracing::debug!(key, error = %e, "local store write failed");
    }
}

fn remove(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::debug!(key, error = %e, "local store remove failed");
    }
}
