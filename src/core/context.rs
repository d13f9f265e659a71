//! The viewport: zoom level, pan offset, view size and the visible tiles.
//!
//! State touched by the tile worker lives in [`ContextShared`] behind two
//! locks. The zoom lock (`view`) is always taken before the cache lock
//! (`caches`), never the other way round.

use crate::background::scheduler::Scheduler;
use crate::core::config::{IterationProfile, ViewerConfig, ViewerProfile};
use crate::core::constants::{INTERESTING_PLACES, PAN_LIMIT, TILE_SIZE};
use crate::core::geo::{RealPoint, TileIndex};
use crate::core::session::SessionState;
use crate::core::surface::RenderSurface;
use crate::core::sync::lock;
use crate::core::zoom::{is_reachable, scale, zoom_in_level, zoom_out_level};
use crate::prelude::Arc;
use crate::tiles::cache::LevelCacheSet;
use crate::tiles::kernel::{MandelbrotKernel, TileKernel};
use crate::tiles::requester::TileRequester;
use crate::tiles::tile::Tile;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

/// Everything guarded by the zoom lock
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ViewState {
    pub zoom_level: u32,
    pub pan_x: i32,
    pub pan_y: i32,
    pub width: i32,
    pub height: i32,
    pub middle_x: i32,
    pub middle_y: i32,
    pub max_iter: u32,
}

impl ViewState {
    /// Screen position of the top-left corner of `tile`
    fn screen_origin(&self, tile: &Tile) -> (i32, i32) {
        (
            tile.virtual_x()
                .saturating_add(self.middle_x)
                .saturating_add(self.pan_x),
            tile.virtual_y()
                .saturating_add(self.middle_y)
                .saturating_add(self.pan_y),
        )
    }

    /// Store a pan offset, clamped to `PAN_LIMIT`
    fn set_pan(&mut self, pan_x: i32, pan_y: i32) {
        self.pan_x = pan_x.clamp(-PAN_LIMIT, PAN_LIMIT);
        self.pan_y = pan_y.clamp(-PAN_LIMIT, PAN_LIMIT);
    }

    /// Virtual pixel at the top-left corner of the view
    fn top_left(&self) -> (i32, i32) {
        (
            self.pan_x.saturating_neg().saturating_sub(self.middle_x),
            self.pan_y.saturating_neg().saturating_sub(self.middle_y),
        )
    }
}

/// State shared between the driving thread and the tile worker
pub(crate) struct ContextShared {
    view: Mutex<ViewState>,
    caches: Mutex<LevelCacheSet>,
    surface: RwLock<Option<Arc<dyn RenderSurface>>>,
    /// A full repaint was requested while no surface was attached
    repaint_owed: AtomicBool,
    iteration: IterationProfile,
}

impl ContextShared {
    fn new(iteration: IterationProfile) -> Self {
        Self {
            view: Mutex::new(ViewState {
                max_iter: iteration.max_iter(0),
                ..ViewState::default()
            }),
            caches: Mutex::new(LevelCacheSet::new()),
            surface: RwLock::new(None),
            repaint_owed: AtomicBool::new(false),
            iteration,
        }
    }

    /// Take the zoom lock
    pub(crate) fn lock_view(&self) -> MutexGuard<'_, ViewState> {
        lock(&self.view)
    }

    /// Take the cache lock. Never call while holding it and then reach for
    /// the zoom lock.
    pub(crate) fn lock_caches(&self) -> MutexGuard<'_, LevelCacheSet> {
        lock(&self.caches)
    }

    pub(crate) fn iteration(&self) -> IterationProfile {
        self.iteration
    }

    fn surface(&self) -> Option<Arc<dyn RenderSurface>> {
        self.surface
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_surface(&self, surface: Option<Arc<dyn RenderSurface>>) {
        match self.surface.write() {
            Ok(mut slot) => *slot = surface,
            Err(poisoned) => *poisoned.into_inner() = surface,
        }
    }

    pub(crate) fn invalidate_all(&self) {
        match self.surface() {
            Some(surface) => surface.invalidate_all(),
            None => self.repaint_owed.store(true, Ordering::Release),
        }
    }

    fn invalidate_tile(&self, view: &ViewState, tile: &Tile) {
        if let Some(surface) = self.surface() {
            let (x, y) = view.screen_origin(tile);
            surface.invalidate_region(
                x.max(0),
                y.max(0),
                x.saturating_add(TILE_SIZE),
                y.saturating_add(TILE_SIZE),
            );
        }
    }

    /// Completion hook, runs on the tile worker
    pub(crate) fn on_tile_completed(&self, tile: &Arc<Tile>) {
        let view = self.lock_view();
        if tile.zoom_level() != view.zoom_level {
            log::trace!(
                "ignoring completion at level {} while at {}",
                tile.zoom_level(),
                view.zoom_level
            );
            return;
        }
        self.invalidate_tile(&view, tile);

        let mirror = self
            .lock_caches()
            .get(tile.zoom_level(), tile.mirror_key());
        if let Some(mirror) = mirror {
            if mirror.complete_from_mirror(tile) {
                log::trace!("mirrored ({}, {}) into ({}, {})", tile.i(), tile.j(), mirror.i(), mirror.j());
                self.invalidate_tile(&view, &mirror);
            }
        }
    }
}

/// Owns the view of the fractal surface and keeps the visible tiles current.
///
/// All methods are meant for the driving thread; the tile worker only
/// reaches the shared part through the completion hook.
pub struct ViewportContext {
    config: ViewerConfig,
    shared: Arc<ContextShared>,
    scheduler: Scheduler,
    requester: TileRequester,
    visible: Vec<Option<Arc<Tile>>>,
    last_top_left: Option<TileIndex>,
    next_place: usize,
    panning: bool,
}

impl ViewportContext {
    /// Create a context computing tiles with `kernel`. Spawns the worker.
    pub fn new(config: ViewerConfig, kernel: Arc<dyn TileKernel>) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(ContextShared::new(config.iteration));

        let hook = shared.clone();
        let scheduler = Scheduler::new(
            kernel,
            &config.scheduler,
            Arc::new(move |tile: &Arc<Tile>| hook.on_tile_completed(tile)),
        )?;
        let requester = TileRequester::new(shared.clone(), scheduler.clone());

        log::info!(
            "viewport context ready (iteration coefficient {})",
            config.iteration.coefficient()
        );
        Ok(Self {
            config,
            shared,
            scheduler,
            requester,
            visible: Vec::new(),
            last_top_left: None,
            next_place: 0,
            panning: false,
        })
    }

    /// Context with the Mandelbrot kernel and a preset configuration
    pub fn with_profile(profile: ViewerProfile) -> Result<Self> {
        Self::new(profile.resolve(), Arc::new(MandelbrotKernel::default()))
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Attach the surface repaints go to. Issues any full repaint owed.
    pub fn set_surface(&self, surface: Arc<dyn RenderSurface>) {
        self.shared.set_surface(Some(surface));
        if self.shared.repaint_owed.swap(false, Ordering::AcqRel) {
            self.shared.invalidate_all();
        }
    }

    pub fn detach_surface(&self) {
        self.shared.set_surface(None);
    }

    /// New view size in screen pixels
    pub fn on_size_changed(&mut self, width: i32, height: i32) {
        {
            let mut view = self.shared.lock_view();
            view.width = width.max(0);
            view.height = height.max(0);
            view.middle_x = view.width / 2;
            view.middle_y = view.height / 2;
        }
        log::debug!("view resized to {}x{}", width, height);
        self.update_all(true);
    }

    pub fn zoom_level(&self) -> u32 {
        self.shared.lock_view().zoom_level
    }

    /// Pan offset in virtual pixels
    pub fn pan(&self) -> (i32, i32) {
        let view = self.shared.lock_view();
        (view.pan_x, view.pan_y)
    }

    pub fn view_size(&self) -> (i32, i32) {
        let view = self.shared.lock_view();
        (view.width, view.height)
    }

    /// Iteration budget of newly requested tiles
    pub fn max_iter(&self) -> u32 {
        self.shared.lock_view().max_iter
    }

    /// Recompute the iteration budget for the current level
    pub fn update_max_iter(&self) -> u32 {
        let mut view = self.shared.lock_view();
        view.max_iter = self.config.iteration.max_iter(view.zoom_level);
        view.max_iter
    }

    /// Point of the complex plane at the centre of the view
    pub fn center(&self) -> RealPoint {
        let view = self.shared.lock_view();
        RealPoint::from_pan(view.pan_x, view.pan_y, scale(view.zoom_level))
    }

    /// Screen position at which `tile` is drawn
    pub fn screen_origin(&self, tile: &Tile) -> (i32, i32) {
        self.shared.lock_view().screen_origin(tile)
    }

    /// Status line: zoom, iteration budget and centre
    pub fn caption(&self) -> String {
        let center = self.center();
        format!(
            "x{}, Iter:{}, c:{:.5}, {:.5}",
            self.zoom_level(),
            self.max_iter(),
            center.x,
            center.y
        )
    }

    /// Tiles covering the view and its margin, row-major
    pub fn visible_tiles(&self) -> &[Option<Arc<Tile>>] {
        &self.visible
    }

    /// Request a tile at the current level and budget
    pub fn request_tile(&self, i: i32, j: i32) -> Arc<Tile> {
        let (zoom_level, max_iter) = {
            let view = self.shared.lock_view();
            (view.zoom_level, view.max_iter)
        };
        self.requester.request_tile(zoom_level, i, j, max_iter)
    }

    pub fn requester(&self) -> TileRequester {
        self.requester.clone()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub(crate) fn shared(&self) -> &Arc<ContextShared> {
        &self.shared
    }

    /// Number of tiles cached across all levels
    pub fn cached_tile_count(&self) -> usize {
        self.shared.lock_caches().tile_count()
    }

    pub fn pause(&self, paused: bool) {
        self.scheduler.pause(paused);
    }

    pub fn set_panning(&mut self, panning: bool) {
        self.panning = panning;
    }

    /// A pan gesture is in progress
    pub fn is_panning(&self) -> bool {
        self.panning
    }

    /// Move the view to a pan offset in virtual pixels
    pub fn pan_to(&mut self, pan_x: i32, pan_y: i32) {
        self.pan_to_pixels(pan_x, pan_y, false);
    }

    pub fn pan_to_pixels(&mut self, pan_x: i32, pan_y: i32, force: bool) {
        {
            let mut view = self.shared.lock_view();
            view.set_pan(pan_x, pan_y);
        }
        if !self.update_all(force) {
            self.shared.invalidate_all();
        }
    }

    /// Centre the view on a point of the complex plane
    pub fn pan_to_real(&mut self, point: RealPoint) {
        let (pan_x, pan_y) = point.to_pan(scale(self.zoom_level()));
        self.pan_to_pixels(pan_x, pan_y, false);
    }

    /// Centre the view on the next built-in point of interest
    pub fn pan_to_interesting_place(&mut self) -> RealPoint {
        let (x, y) = INTERESTING_PLACES[self.next_place % INTERESTING_PLACES.len()];
        self.next_place = (self.next_place + 1) % INTERESTING_PLACES.len();
        let point = RealPoint::new(x, y);
        self.pan_to_real(point);
        point
    }

    pub fn zoom_in(&mut self) -> bool {
        let level = zoom_in_level(self.zoom_level());
        self.commit_zoom(level)
    }

    pub fn zoom_out(&mut self) -> bool {
        let level = zoom_out_level(self.zoom_level());
        self.commit_zoom(level)
    }

    /// Zoom in (`steps > 0`) or out one level at a time. Returns the
    /// resulting level.
    pub fn change_zoom_by(&mut self, steps: i32) -> u32 {
        for _ in 0..steps.unsigned_abs() {
            let changed = if steps > 0 {
                self.zoom_in()
            } else {
                self.zoom_out()
            };
            if !changed {
                break;
            }
        }
        self.zoom_level()
    }

    /// Jump to `level`, keeping the focal point fixed
    pub fn zoom_to_level(&mut self, level: u32) -> Result<()> {
        if !is_reachable(level) {
            return Err(Error::InvalidZoomLevel(level));
        }
        self.commit_zoom(level);
        Ok(())
    }

    /// Switch to `level`, rescaling the pan offset in the same critical
    /// section. Returns false if the level did not change.
    fn commit_zoom(&mut self, level: u32) -> bool {
        let old = {
            let mut view = self.shared.lock_view();
            let old = view.zoom_level;
            if old == level {
                return false;
            }
            let ratio = scale(level) / scale(old);
            // float to int casts saturate, set_pan clamps the rest
            let pan_x = (view.pan_x as f64 * ratio) as i32;
            let pan_y = (view.pan_y as f64 * ratio) as i32;
            view.set_pan(pan_x, pan_y);
            view.zoom_level = level;
            view.max_iter = self.config.iteration.max_iter(level);
            self.scheduler.clear();
            old
        };
        log::info!("zoom level {} -> {}", old, level);
        self.update_all(true);
        true
    }

    /// Reset the view and cache, then show `point` at `level` straight away
    pub fn reset_to(&mut self, level: u32, point: RealPoint) -> Result<()> {
        if !is_reachable(level) {
            return Err(Error::InvalidZoomLevel(level));
        }
        {
            let mut view = self.shared.lock_view();
            view.zoom_level = level;
            let (pan_x, pan_y) = point.to_pan(scale(level));
            view.set_pan(pan_x, pan_y);
            view.max_iter = self.config.iteration.max_iter(level);
            self.scheduler.clear();
            self.shared.lock_caches().clear();
        }
        self.visible.iter_mut().for_each(|slot| *slot = None);
        self.last_top_left = None;
        log::info!("view reset to level {} at ({}, {})", level, point.x, point.y);
        self.update_all(true);
        Ok(())
    }

    /// Drop every cached tile and all queued work.
    ///
    /// The visible list is emptied; call [`ViewportContext::update_all`] to
    /// request the view again.
    pub fn clear_cache(&mut self) {
        {
            let _view = self.shared.lock_view();
            self.scheduler.clear();
            self.shared.lock_caches().clear();
        }
        self.visible.iter_mut().for_each(|slot| *slot = None);
        self.last_top_left = None;
        log::info!("tile cache cleared");
    }

    /// Bring the visible tile list up to date. Returns true if it was
    /// rebuilt.
    ///
    /// Without `force` nothing happens while the top-left tile of the view
    /// stays the same.
    pub fn update_all(&mut self, force: bool) -> bool {
        let view = *self.shared.lock_view();
        let nx = view.width / TILE_SIZE + 2;
        let ny = view.height / TILE_SIZE + 2;
        let count = (nx * ny) as usize;

        let mut force = force;
        if self.visible.len() != count {
            self.visible.resize(count, None);
            force = true;
        }

        let (left, top) = view.top_left();
        let top_left = TileIndex::containing(left, top);
        if !force && self.last_top_left == Some(top_left) {
            return false;
        }
        self.last_top_left = Some(top_left);

        // start one tile early for the margin
        let (i0, j0) = (top_left.i - 1, top_left.j - 1);
        let mut slots = self.visible.iter_mut();
        for j in j0..j0 + ny {
            for i in i0..i0 + nx {
                let tile = self.requester.request_tile(view.zoom_level, i, j, view.max_iter);
                if let Some(slot) = slots.next() {
                    *slot = Some(tile);
                }
            }
        }
        slots.for_each(|slot| *slot = None);

        log::debug!(
            "visible grid {}x{} from ({}, {}) at level {}",
            nx,
            ny,
            i0,
            j0,
            view.zoom_level
        );
        self.shared.invalidate_all();
        true
    }

    /// Capture zoom and pan, plus the visible tiles when the session config
    /// asks for them
    pub fn save_state(&self) -> Result<SessionState> {
        let (zoom_level, (pan_x, pan_y)) = (self.zoom_level(), self.pan());
        let mut state = SessionState::new(zoom_level, pan_x, pan_y);
        if self.config.session.persist_tiles {
            for tile in self.visible.iter().flatten() {
                state.push_tile(tile)?;
            }
        }
        Ok(state)
    }

    /// Restore a saved session. Malformed tile records are skipped.
    pub fn restore_state(&mut self, state: &SessionState) -> Result<()> {
        if !is_reachable(state.zoom_level) {
            return Err(Error::InvalidZoomLevel(state.zoom_level));
        }
        let tiles = state.restored_tiles();
        {
            let mut view = self.shared.lock_view();
            view.zoom_level = state.zoom_level;
            view.set_pan(state.pan_x, state.pan_y);
            view.max_iter = self.config.iteration.max_iter(state.zoom_level);
            self.scheduler.clear();
            let mut caches = self.shared.lock_caches();
            caches.clear();
            for tile in tiles {
                caches.insert(Arc::new(tile));
            }
        }
        self.last_top_left = None;
        log::info!(
            "restored session at level {} with {} tiles",
            state.zoom_level,
            self.cached_tile_count()
        );
        self.update_all(true);
        Ok(())
    }

    /// Stop the worker and wait for it to exit
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }
}

impl Drop for ViewportContext {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}
