use crate::background::scheduler::Scheduler;
use crate::core::context::ContextShared;
use crate::core::zoom::depth;
use crate::prelude::Arc;
use crate::tiles::tile::Tile;

/// The cache protocol: fetch-or-create a tile, give it a preview, and hand it
/// to the scheduler if it still needs computing.
///
/// Cheap to clone; the viewport and the snapshot generator each hold one.
#[derive(Clone)]
pub struct TileRequester {
    shared: Arc<ContextShared>,
    scheduler: Scheduler,
}

impl TileRequester {
    pub(crate) fn new(shared: Arc<ContextShared>, scheduler: Scheduler) -> Self {
        Self { shared, scheduler }
    }

    pub(crate) fn shared(&self) -> &Arc<ContextShared> {
        &self.shared
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Return the cached tile at `(zoom_level, i, j)`, creating it if needed.
    ///
    /// Repeated calls return the same instance until the cache is cleared;
    /// `max_iter` only matters for the call that creates the tile. An
    /// incomplete tile gets a preview from its ancestors (when it has no
    /// raster yet) and is queued for computation.
    pub fn request_tile(&self, zoom_level: u32, i: i32, j: i32, max_iter: u32) -> Arc<Tile> {
        let (tile, created) = self
            .shared
            .lock_caches()
            .get_or_create(zoom_level, i, j, max_iter);
        if created {
            log::trace!("created tile z={} ({}, {})", zoom_level, i, j);
        }

        if !tile.is_completed() {
            if zoom_level > 0 && !tile.has_raster() {
                self.prepare_preview(&tile);
            }
            self.scheduler.schedule(&tile);
        }
        tile
    }

    /// Walk up the ancestors of `tile` until one has a raster, creating the
    /// missing ones, then stretch each ancestor's quadrant down the chain.
    fn prepare_preview(&self, tile: &Arc<Tile>) {
        let mut chain = vec![tile.clone()];
        {
            let mut caches = self.shared.lock_caches();
            let mut current = tile.clone();
            for _ in 0..depth(tile.zoom_level()) {
                if current.zoom_level() == 0 {
                    break;
                }
                let level = current.lower_level();
                let index = current.index().parent();
                let max_iter = self.shared.iteration().max_iter(level);
                let (parent, _) = caches.get_or_create(level, index.i, index.j, max_iter);
                chain.push(parent.clone());
                if parent.has_raster() {
                    break;
                }
                current = parent;
            }
        }

        // deepest first, so each child sees its parent's fresh preview
        for pair in chain.windows(2).rev() {
            pair[0].preview_from_parent(&pair[1]);
        }
    }
}
