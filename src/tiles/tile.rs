use crate::core::constants::TILE_SIZE;
use crate::core::geo::{index_to_pixel, TileIndex};
use crate::core::sync::lock;
use crate::core::zoom::lower_level;
use image::{imageops, ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Pixel buffer of one tile, `TILE_SIZE` x `TILE_SIZE` RGBA
pub type TileRaster = RgbaImage;

/// Cache key of a tile within one zoom level.
///
/// Packs both 32-bit indices side by side, so distinct `(i, j)` pairs never
/// collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey(pub u64);

impl TileKey {
    pub fn new(i: i32, j: i32) -> Self {
        Self(((i as u32 as u64) << 32) | (j as u32 as u64))
    }

    pub fn from_index(index: TileIndex) -> Self {
        Self::new(index.i, index.j)
    }

    pub fn index(&self) -> TileIndex {
        TileIndex::new((self.0 >> 32) as u32 as i32, self.0 as u32 as i32)
    }

    /// Key of the tile reflected across the real axis
    pub fn mirror(&self) -> Self {
        Self::from_index(self.index().mirror())
    }

    /// Key of the ancestor covering this tile at the lower zoom level
    pub fn parent(&self) -> Self {
        Self::from_index(self.index().parent())
    }
}

/// A cached raster unit at one zoom level.
///
/// Tiles are shared as `Arc<Tile>` between the cache, the visible tile list,
/// the scheduler queue and the snapshot generator, and are mutated in place:
/// the raster first holds a stretched preview, then the computed pixels.
pub struct Tile {
    key: TileKey,
    zoom_level: u32,
    index: TileIndex,
    max_iter: u32,
    raster: Mutex<Option<TileRaster>>,
    completed: AtomicBool,
    queued: AtomicBool,
}

impl Tile {
    pub fn new(zoom_level: u32, i: i32, j: i32, max_iter: u32) -> Self {
        Self {
            key: TileKey::new(i, j),
            zoom_level,
            index: TileIndex::new(i, j),
            max_iter,
            raster: Mutex::new(None),
            completed: AtomicBool::new(false),
            queued: AtomicBool::new(false),
        }
    }

    /// Rebuild a tile from persisted state
    pub(crate) fn restored(
        zoom_level: u32,
        index: TileIndex,
        max_iter: u32,
        raster: Option<TileRaster>,
        completed: bool,
    ) -> Self {
        let tile = Self::new(zoom_level, index.i, index.j, max_iter);
        let completed = completed && raster.is_some();
        *lock(&tile.raster) = raster;
        tile.completed.store(completed, Ordering::Release);
        tile
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn zoom_level(&self) -> u32 {
        self.zoom_level
    }

    pub fn index(&self) -> TileIndex {
        self.index
    }

    pub fn i(&self) -> i32 {
        self.index.i
    }

    pub fn j(&self) -> i32 {
        self.index.j
    }

    pub fn max_iter(&self) -> u32 {
        self.max_iter
    }

    pub fn virtual_x(&self) -> i32 {
        index_to_pixel(self.index.i)
    }

    pub fn virtual_y(&self) -> i32 {
        index_to_pixel(self.index.j)
    }

    /// Zoom level of the ancestor this tile takes its preview from
    pub fn lower_level(&self) -> u32 {
        lower_level(self.zoom_level)
    }

    /// Key of the ancestor in the [`Tile::lower_level`] cache
    pub fn lower_level_key(&self) -> TileKey {
        self.key.parent()
    }

    /// Key of the tile with identical (vertically flipped) content
    pub fn mirror_key(&self) -> TileKey {
        self.key.mirror()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn has_raster(&self) -> bool {
        lock(&self.raster).is_some()
    }

    /// Copy of the current raster, preview or final
    pub fn raster(&self) -> Option<TileRaster> {
        lock(&self.raster).clone()
    }

    /// Run `f` against the current raster without copying it
    pub fn with_raster<R>(&self, f: impl FnOnce(&TileRaster) -> R) -> Option<R> {
        lock(&self.raster).as_ref().map(f)
    }

    /// Store the computed pixels and mark the tile complete
    pub fn complete(&self, raster: TileRaster) {
        *lock(&self.raster) = Some(raster);
        self.completed.store(true, Ordering::Release);
    }

    /// Fill this tile with a stretched copy of the quadrant of `parent` it
    /// covers. Leaves the tile incomplete. Returns false when there was
    /// nothing to do.
    pub fn preview_from_parent(&self, parent: &Tile) -> bool {
        if self.has_raster() {
            return false;
        }
        let half = (TILE_SIZE / 2) as u32;
        let ox = (self.index.i & 1) as u32 * half;
        let oy = (self.index.j & 1) as u32 * half;
        let preview = parent.with_raster(|source| {
            ImageBuffer::from_fn(TILE_SIZE as u32, TILE_SIZE as u32, |x, y| {
                *source.get_pixel(ox + x / 2, oy + y / 2)
            })
        });
        match preview {
            Some(preview) => {
                let mut raster = lock(&self.raster);
                // the worker may have completed us in the meantime
                if raster.is_none() {
                    *raster = Some(preview);
                }
                true
            }
            None => false,
        }
    }

    /// Complete this tile from its completed mirror. Returns false when the
    /// source has no raster or this tile is already complete.
    pub fn complete_from_mirror(&self, source: &Tile) -> bool {
        if self.is_completed() {
            return false;
        }
        // clone out first: never hold two tile locks at once
        match source.with_raster(|raster| imageops::flip_vertical(raster)) {
            Some(flipped) => {
                self.complete(flipped);
                true
            }
            None => false,
        }
    }

    /// Claim the queued flag; false if the tile already sits in a queue
    pub(crate) fn mark_queued(&self) -> bool {
        !self.queued.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn clear_queued(&self) {
        self.queued.store(false, Ordering::Release);
    }

    pub fn is_queued(&self) -> bool {
        self.queued.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("zoom_level", &self.zoom_level)
            .field("i", &self.index.i)
            .field("j", &self.index.j)
            .field("max_iter", &self.max_iter)
            .field("completed", &self.is_completed())
            .field("has_raster", &self.has_raster())
            .finish()
    }
}

/// Raster of one solid colour, handy for tests and placeholders
pub fn solid_raster(color: Rgba<u8>) -> TileRaster {
    ImageBuffer::from_pixel(TILE_SIZE as u32, TILE_SIZE as u32, color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip() {
        for (i, j) in [(0, 0), (-1, 0), (0, -1), (i32::MIN, i32::MAX), (1234, -5678)] {
            let key = TileKey::new(i, j);
            assert_eq!(key.index(), TileIndex::new(i, j));
        }
        assert_ne!(TileKey::new(1, 0), TileKey::new(0, 1));
        assert_ne!(TileKey::new(-1, 0), TileKey::new(0, -1));
    }

    #[test]
    fn test_mirror_key_involution() {
        for (i, j) in [(0, 0), (3, -4), (-7, 9), (0, -1)] {
            let key = TileKey::new(i, j);
            assert_ne!(key.mirror(), key);
            assert_eq!(key.mirror().mirror(), key);
        }
        let tile = Tile::new(4, 2, 5, 30);
        assert_eq!(tile.mirror_key(), TileKey::new(2, -6));
    }

    #[test]
    fn test_lower_level_key_uses_both_indices() {
        let tile = Tile::new(8, 6, -3, 30);
        assert_eq!(tile.lower_level(), 4);
        assert_eq!(tile.lower_level_key(), TileKey::new(3, -2));
    }

    #[test]
    fn test_preview_takes_matching_quadrant() {
        let parent = Tile::new(1, 0, 0, 15);
        let mut raster = solid_raster(Rgba([0, 0, 0, 255]));
        let half = (TILE_SIZE / 2) as u32;
        for y in 0..half {
            for x in half..TILE_SIZE as u32 {
                raster.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        parent.complete(raster);

        // (1, 0) at level 2 covers the top-right quadrant of (0, 0) at level 1
        let child = Tile::new(2, 1, 0, 15);
        assert!(child.preview_from_parent(&parent));
        assert!(!child.is_completed());
        let preview = child.raster().unwrap();
        assert!(preview.pixels().all(|p| *p == Rgba([255, 0, 0, 255])));

        let other = Tile::new(2, 0, 1, 15);
        assert!(other.preview_from_parent(&parent));
        assert!(other.raster().unwrap().pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_preview_needs_parent_raster() {
        let parent = Tile::new(1, 0, 0, 15);
        let child = Tile::new(2, 0, 0, 15);
        assert!(!child.preview_from_parent(&parent));
        assert!(!child.has_raster());
    }

    #[test]
    fn test_complete_from_mirror_flips() {
        let source = Tile::new(1, 0, 0, 15);
        let mut raster = solid_raster(Rgba([0, 0, 0, 255]));
        raster.put_pixel(5, 0, Rgba([9, 9, 9, 255]));
        source.complete(raster);

        let mirror = Tile::new(1, 0, -1, 15);
        assert!(mirror.complete_from_mirror(&source));
        assert!(mirror.is_completed());
        let flipped = mirror.raster().unwrap();
        assert_eq!(*flipped.get_pixel(5, TILE_SIZE as u32 - 1), Rgba([9, 9, 9, 255]));
        assert!(!mirror.complete_from_mirror(&source));
    }

    #[test]
    fn test_queued_flag() {
        let tile = Tile::new(0, 0, 0, 15);
        assert!(tile.mark_queued());
        assert!(!tile.mark_queued());
        tile.clear_queued();
        assert!(tile.mark_queued());
    }
}
