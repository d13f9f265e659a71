//! Prelude module for common tilebrot types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilebrot::prelude::*;`

pub use crate::core::{
    constants::{MAX_ZOOM_LEVEL, PAN_LIMIT, TILE_SIZE},
    config::{
        FlyConfig, IterationProfile, SchedulerConfig, SessionConfig, SnapshotConfig,
        ViewerConfig, ViewerProfile,
    },
    context::ViewportContext,
    geo::{index_to_pixel, pixel_to_index, PixelRect, RealPoint, TileIndex},
    session::{SessionState, TileRecord},
    surface::{ChannelSurface, Invalidation, NullSurface, RenderSurface},
    viewer::FractalViewer,
    zoom::{is_reachable, lower_level, max_iter, scale, zoom_in_level, zoom_out_level},
};

pub use crate::tiles::{
    cache::{LevelCacheSet, TileCache},
    kernel::{MandelbrotKernel, Palette, TileKernel},
    requester::TileRequester,
    tile::{Tile, TileKey, TileRaster},
};

pub use crate::background::{
    scheduler::{CompletionCallback, Scheduler},
    snapshot::{SnapshotCallback, SnapshotGenerator, SnapshotPoll},
};

pub use crate::animation::{
    fly::{FlySequencer, FlyTick, KeepAwake, NoopKeepAwake},
    tape::{FlyInstruction, FlyTape},
};

pub use crate::input::{
    events::{Command, InputEvent, KeyCode},
    handler::InputHandler,
};

pub use crate::{Error as TileError, Result};

pub use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
