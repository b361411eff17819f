//! Bounded LRU cache of summary tiles
//!
//! Tiles are shared through `Arc` so a cached tile can be handed to several
//! readers while the cache evicts it. Lookups and inserts take a short lock;
//! two callers missing the same key may both compute the tile, and the last
//! insert wins.

use crate::core::{SummaryTile, WindowFunction};
use cached::{Cached, SizedCache};
use log::{debug, trace};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Tiles kept per selector unless configured otherwise
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Identity of one summary tile
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub chr: String,
    pub zoom: u32,
    pub tile: u64,
    pub window_function: WindowFunction,
}

impl TileKey {
    pub fn new(
        chr: impl Into<String>,
        zoom: u32,
        tile: u64,
        window_function: WindowFunction,
    ) -> Self {
        Self {
            chr: chr.into(),
            zoom,
            tile,
            window_function,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.chr, self.zoom, self.tile, self.window_function
        )
    }
}

/// Thread-safe LRU map from [`TileKey`] to [`SummaryTile`]
pub struct TileCache {
    inner: Mutex<SizedCache<TileKey, Arc<SummaryTile>>>,
    capacity: usize,
}

impl TileCache {
    /// Cache holding at most `capacity` tiles (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(SizedCache::with_size(capacity)),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, SizedCache<TileKey, Arc<SummaryTile>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a tile, marking it most recently used
    pub fn get(&self, key: &TileKey) -> Option<Arc<SummaryTile>> {
        let hit = self.lock().cache_get(key).cloned();
        trace!("tile cache {} for {}", if hit.is_some() { "hit" } else { "miss" }, key);
        hit
    }

    /// Insert a tile, evicting the least recently used one when full
    pub fn put(&self, key: TileKey, tile: Arc<SummaryTile>) {
        let mut cache = self.lock();
        let before = cache.cache_size();
        let replaced = cache.cache_set(key, tile).is_some();
        if !replaced && before == self.capacity {
            trace!("tile cache full, evicted least recently used tile");
        }
    }

    pub fn clear(&self) {
        let mut cache = self.lock();
        debug!("clearing {} cached tiles", cache.cache_size());
        cache.cache_clear();
    }

    pub fn len(&self) -> usize {
        self.lock().cache_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl fmt::Debug for TileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
