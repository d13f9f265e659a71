use crate::core::context::ViewportContext;
use crate::core::geo::PixelRect;
use crate::prelude::Arc;
use crate::tiles::tile::Tile;
use image::{imageops, RgbaImage};
use std::time::Duration;

/// Called once with the finished image, or with `None` if the generator was
/// dropped before every tile arrived
pub type SnapshotCallback = Box<dyn FnOnce(Option<&RgbaImage>) + Send>;

/// What the caller should do after a [`SnapshotGenerator::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPoll {
    /// Tiles are still outstanding, poll again after the delay
    Pending(Duration),
    Done,
}

/// One-shot export of a rectangle of the surface into a single image.
///
/// Requests every covering tile up front and composites them as they
/// complete.
pub struct SnapshotGenerator {
    waiting: Vec<Arc<Tile>>,
    origin_x: i32,
    origin_y: i32,
    image: RgbaImage,
    wait_per_tile: Duration,
    on_complete: Option<SnapshotCallback>,
}

impl SnapshotGenerator {
    /// Start a snapshot of `width` x `height` pixels centred on the current
    /// view. A zero dimension means the view's own.
    pub fn start(
        ctx: &ViewportContext,
        width: u32,
        height: u32,
        on_complete: SnapshotCallback,
    ) -> Self {
        let requester = ctx.requester();
        let (rect, waiting) = {
            let view = ctx.shared().lock_view();
            let width = if width == 0 { view.width } else { width as i32 };
            let height = if height == 0 { view.height } else { height as i32 };
            let rect = PixelRect::around_pan(view.pan_x, view.pan_y, width, height);
            let waiting: Vec<_> = rect
                .covering_tiles()
                .into_iter()
                .map(|index| {
                    requester.request_tile(view.zoom_level, index.i, index.j, view.max_iter)
                })
                .collect();
            (rect, waiting)
        };

        log::info!(
            "snapshot of {}x{} started, {} tiles",
            rect.width(),
            rect.height(),
            waiting.len()
        );
        Self {
            waiting,
            origin_x: rect.x0,
            origin_y: rect.y0,
            image: RgbaImage::new(rect.width().max(0) as u32, rect.height().max(0) as u32),
            wait_per_tile: ctx.config().snapshot.wait_per_tile(),
            on_complete: Some(on_complete),
        }
    }

    /// Composite every tile that completed since the last poll
    pub fn poll(&mut self) -> SnapshotPoll {
        if self.on_complete.is_none() {
            return SnapshotPoll::Done;
        }

        let image = &mut self.image;
        let (origin_x, origin_y) = (self.origin_x, self.origin_y);
        self.waiting.retain(|tile| {
            if !tile.is_completed() {
                return true;
            }
            let x = (tile.virtual_x() - origin_x) as i64;
            let y = (tile.virtual_y() - origin_y) as i64;
            if tile
                .with_raster(|raster| imageops::replace(&mut *image, raster, x, y))
                .is_none()
            {
                log::debug!("completed tile ({}, {}) has no raster", tile.i(), tile.j());
            }
            false
        });

        if self.waiting.is_empty() {
            log::info!("snapshot complete");
            if let Some(on_complete) = self.on_complete.take() {
                on_complete(Some(&self.image));
            }
            SnapshotPoll::Done
        } else {
            SnapshotPoll::Pending(self.wait_per_tile * self.waiting.len() as u32)
        }
    }

    /// Poll and sleep on the calling thread until every tile is in
    pub fn run_to_completion(&mut self) {
        while let SnapshotPoll::Pending(delay) = self.poll() {
            std::thread::sleep(delay);
        }
    }

    pub fn is_done(&self) -> bool {
        self.on_complete.is_none()
    }

    pub fn remaining(&self) -> usize {
        self.waiting.len()
    }

    /// The image as composited so far
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(mut self) -> RgbaImage {
        std::mem::take(&mut self.image)
    }
}

impl Drop for SnapshotGenerator {
    fn drop(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            log::debug!("snapshot dropped with {} tiles outstanding", self.waiting.len());
            on_complete(None);
        }
    }
}
