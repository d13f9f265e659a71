//! # tilebrot
//!
//! An infinite, pannable, zoomable fractal surface built from fixed-size
//! raster tiles.
//!
//! The virtual plane is cut into `TILE_SIZE` square tiles that are cached per
//! zoom level and computed by a single background worker. While a tile is
//! pending it shows a stretched preview taken from its lower-resolution
//! ancestor, and every completed tile also fills its reflection across the
//! real axis. A scripted camera ("fly mode") and a one-shot snapshot exporter
//! sit on top of the same cache protocol.

pub mod animation;
pub mod background;
pub mod core;
pub mod input;
pub mod prelude;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{IterationProfile, ViewerConfig, ViewerProfile},
    context::ViewportContext,
    geo::{index_to_pixel, pixel_to_index, TileIndex},
    session::SessionState,
    surface::{ChannelSurface, Invalidation, NullSurface, RenderSurface},
    viewer::FractalViewer,
};

pub use tiles::{
    cache::{LevelCacheSet, TileCache},
    kernel::{MandelbrotKernel, TileKernel},
    requester::TileRequester,
    tile::{Tile, TileKey},
};

pub use background::{scheduler::Scheduler, snapshot::SnapshotGenerator};

pub use animation::{
    fly::{FlySequencer, FlyTick, KeepAwake, NoopKeepAwake},
    tape::{FlyInstruction, FlyTape},
};

pub use input::{
    events::{Command, InputEvent, KeyCode},
    handler::InputHandler,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tile record error: {0}")]
    Record(#[from] bincode::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Malformed tile record: {0}")]
    MalformedRecord(String),

    #[error("Invalid fly instruction at word {index}: {reason}")]
    InvalidInstruction { index: usize, reason: String },

    #[error("Unreachable zoom level: {0}")]
    InvalidZoomLevel(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error type alias for convenience
pub type Error = TileError;

/// Install `env_logger` as the `log` backend, honouring `RUST_LOG`.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
