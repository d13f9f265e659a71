//! Core constants shared by the tile engine.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Edge length of a square tile in pixels.
pub const TILE_SIZE: i32 = 128;

/// Pixels per real-plane unit at zoom level 1. Level 0 uses half of this and
/// every further level doubles it.
pub const BASE_SCALE: f64 = 256.0;

/// Deepest zoom level. At this level `scale * 2` still fits inside
/// [`PAN_LIMIT`], so the whole set keeps an exact pan offset.
pub const MAX_ZOOM_LEVEL: u32 = 1 << 19;

/// Pan offsets are clamped to `-PAN_LIMIT..=PAN_LIMIT` virtual pixels, which
/// leaves headroom in `i32` for view sizes and tile edges.
pub const PAN_LIMIT: i32 = 1 << 29;

/// Iteration coefficient of the coarse preset.
pub const COARSE_ITER_COEF: u32 = 15;

/// Iteration coefficient of the fine preset.
pub const FINE_ITER_COEF: u32 = 30;

/// Fly mode cadence (20 ticks per second).
pub const FLY_TICK_MS: u64 = 1000 / 20;

/// A fly-mode pan advances `TILE_SIZE / FLY_PAN_STEP_DIVISOR` pixels per tick.
pub const FLY_PAN_STEP_DIVISOR: i32 = 4;

/// Snapshot polling waits this long per tile still outstanding.
pub const SNAPSHOT_WAIT_PER_TILE_MS: u64 = 10;

/// Name given to the background tile worker thread.
pub const WORKER_THREAD_NAME: &str = "tile-worker";

/// Points of interest cycled by `Command::PanToInterestingPlace`, as (re, im).
pub const INTERESTING_PLACES: [(f64, f64); 3] = [
    (-1.75967, 0.02038),
    (-1.25565, 0.38156),
    (-0.66992, -0.45215),
];
