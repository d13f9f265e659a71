//! The rendering surface the engine reports repaints to.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Something that repaints committed tiles when told which screen area changed.
///
/// Called from the driving thread after viewport changes and from the tile
/// worker after every completion, so implementations must be cheap and must
/// not call back into the engine.
pub trait RenderSurface: Send + Sync {
    /// Repaint the screen rectangle `[x0, x1) x [y0, y1)`
    fn invalidate_region(&self, x0: i32, y0: i32, x1: i32, y1: i32);

    /// Repaint everything
    fn invalidate_all(&self);
}

/// Surface that ignores every repaint request (headless use)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn invalidate_region(&self, _x0: i32, _y0: i32, _x1: i32, _y1: i32) {}

    fn invalidate_all(&self) {}
}

/// A repaint request forwarded by [`ChannelSurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    Region { x0: i32, y0: i32, x1: i32, y1: i32 },
    All,
}

/// Surface that forwards repaint requests over a channel so a host can drain
/// them on its own frame loop.
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    tx: Sender<Invalidation>,
}

impl ChannelSurface {
    /// Create a surface and the receiver its requests arrive on
    pub fn new() -> (Self, Receiver<Invalidation>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl RenderSurface for ChannelSurface {
    fn invalidate_region(&self, x0: i32, y0: i32, x1: i32, y1: i32) {
        // A dropped receiver just means nobody is painting any more
        let _ = self.tx.send(Invalidation::Region { x0, y0, x1, y1 });
    }

    fn invalidate_all(&self) {
        let _ = self.tx.send(Invalidation::All);
    }
}
