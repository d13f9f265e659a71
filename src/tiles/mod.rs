pub mod cache;
pub mod kernel;
pub mod requester;
pub mod tile;

// Re-exports for convenience
pub use cache::{LevelCacheSet, TileCache};
pub use kernel::{MandelbrotKernel, Palette, TileKernel};
pub use requester::TileRequester;
pub use tile::{Tile, TileKey, TileRaster};
