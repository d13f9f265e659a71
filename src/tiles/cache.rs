use crate::prelude::{Arc, HashMap};
use crate::tiles::tile::{Tile, TileKey};

/// All tiles of one zoom level.
///
/// There is no eviction: the cache only grows until the whole set is cleared.
/// A per-level LRU would slot in here if memory ever needs bounding.
#[derive(Debug, Default)]
pub struct TileCache {
    tiles: HashMap<TileKey, Arc<Tile>>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a tile from the cache
    pub fn get(&self, key: TileKey) -> Option<&Arc<Tile>> {
        self.tiles.get(&key)
    }

    /// Return the cached tile for `key`, inserting the one built by `create`
    /// if there is none yet
    pub fn get_or_insert_with(
        &mut self,
        key: TileKey,
        create: impl FnOnce() -> Tile,
    ) -> Arc<Tile> {
        self.tiles
            .entry(key)
            .or_insert_with(|| Arc::new(create()))
            .clone()
    }

    /// Insert a tile, replacing any tile with the same key
    pub fn insert(&mut self, tile: Arc<Tile>) {
        self.tiles.insert(tile.key(), tile);
    }

    /// Check if a tile is in the cache
    pub fn contains(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    /// Get the current number of cached tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.tiles.values().filter(|t| t.is_completed()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tile>> {
        self.tiles.values()
    }
}

/// One [`TileCache`] per zoom level, created lazily
#[derive(Debug, Default)]
pub struct LevelCacheSet {
    levels: HashMap<u32, TileCache>,
}

impl LevelCacheSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, zoom_level: u32) -> Option<&TileCache> {
        self.levels.get(&zoom_level)
    }

    /// The cache of `zoom_level`, created if this is the first request for it
    pub fn level_mut(&mut self, zoom_level: u32) -> &mut TileCache {
        self.levels.entry(zoom_level).or_default()
    }

    /// Look up one tile
    pub fn get(&self, zoom_level: u32, key: TileKey) -> Option<Arc<Tile>> {
        self.level(zoom_level).and_then(|cache| cache.get(key)).cloned()
    }

    /// Fetch-or-insert the tile at `(zoom_level, i, j)`.
    ///
    /// Returns the tile and whether it was created by this call.
    pub fn get_or_create(
        &mut self,
        zoom_level: u32,
        i: i32,
        j: i32,
        max_iter: u32,
    ) -> (Arc<Tile>, bool) {
        let key = TileKey::new(i, j);
        let cache = self.level_mut(zoom_level);
        if let Some(tile) = cache.get(key) {
            return (tile.clone(), false);
        }
        let tile = cache.get_or_insert_with(key, || Tile::new(zoom_level, i, j, max_iter));
        (tile, true)
    }

    /// Insert a tile in its own level's cache
    pub fn insert(&mut self, tile: Arc<Tile>) {
        self.level_mut(tile.zoom_level()).insert(tile);
    }

    /// Drop every level
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Number of tiles across all levels
    pub fn tile_count(&self) -> usize {
        self.levels.values().map(TileCache::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tile_count() == 0
    }
}
