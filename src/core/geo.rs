use crate::core::constants::TILE_SIZE;
use serde::{Deserialize, Serialize};

/// Maps a virtual pixel coordinate to the index of the tile containing it.
///
/// This is floor division, not truncation: negative coordinates round towards
/// negative infinity so that tile `-1` covers `[-TILE_SIZE, -1]` and the grid
/// has neither a gap nor an overlap at zero.
pub fn pixel_to_index(xy: i32) -> i32 {
    if xy >= 0 {
        xy / TILE_SIZE
    } else {
        // -(xy + 1) cannot overflow, even for i32::MIN
        let magnitude = (-(xy + 1)) as u32 / TILE_SIZE as u32;
        -(magnitude as i32) - 1
    }
}

/// Virtual pixel coordinate of the top-left edge of tile `ij`.
pub fn index_to_pixel(ij: i32) -> i32 {
    ij * TILE_SIZE
}

/// Grid coordinates of a tile at some zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileIndex {
    pub i: i32,
    pub j: i32,
}

impl TileIndex {
    pub fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Index of the tile containing the virtual pixel `(x, y)`
    pub fn containing(x: i32, y: i32) -> Self {
        Self::new(pixel_to_index(x), pixel_to_index(y))
    }

    /// Index of the tile covering the same area at half the zoom level
    pub fn parent(&self) -> Self {
        Self::new(self.i >> 1, self.j >> 1)
    }

    /// Index of the tile reflected across the real axis
    pub fn mirror(&self) -> Self {
        Self::new(self.i, -self.j - 1)
    }

    /// Virtual pixel position of the top-left corner
    pub fn virtual_origin(&self) -> (i32, i32) {
        (index_to_pixel(self.i), index_to_pixel(self.j))
    }
}

/// Rectangle in virtual or screen pixel space, `x1`/`y1` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelRect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Virtual rectangle seen through a view of `width` x `height` centred on
    /// the given pan offset.
    /// An odd size puts the extra pixel on the right or bottom edge.
    pub fn around_pan(pan_x: i32, pan_y: i32, width: i32, height: i32) -> Self {
        let x0 = pan_x.saturating_neg().saturating_sub(width / 2);
        let y0 = pan_y.saturating_neg().saturating_sub(height / 2);
        Self::new(x0, y0, x0.saturating_add(width), y0.saturating_add(height))
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    /// Tile indices whose tiles intersect this rectangle, row-major
    pub fn covering_tiles(&self) -> Vec<TileIndex> {
        let top_left = TileIndex::containing(self.x0, self.y0);
        let mut tiles = Vec::new();
        let mut j = top_left.j;
        while index_to_pixel(j) < self.y1 {
            let mut i = top_left.i;
            while index_to_pixel(i) < self.x1 {
                tiles.push(TileIndex::new(i, j));
                i += 1;
            }
            j += 1;
        }
        tiles
    }
}

/// A point on the complex plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealPoint {
    pub x: f64,
    pub y: f64,
}

impl RealPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Pan offset that centres the view on this point at the given scale.
    /// Truncates towards zero.
    pub fn to_pan(&self, scale: f64) -> (i32, i32) {
        let zoom = -scale;
        ((self.x * zoom) as i32, (self.y * zoom) as i32)
    }

    /// Inverse of [`RealPoint::to_pan`]
    pub fn from_pan(pan_x: i32, pan_y: i32, scale: f64) -> Self {
        let zoom = -scale;
        // `+ 0.0` turns the -0.0 of a zero pan into 0.0
        Self::new(pan_x as f64 / zoom + 0.0, pan_y as f64 / zoom + 0.0)
    }
}

impl Default for RealPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for k in [-70_000, -1025, -3, -2, -1, 0, 1, 2, 3, 1024, 70_000] {
            assert_eq!(pixel_to_index(index_to_pixel(k)), k);
        }
    }

    #[test]
    fn test_negative_pixels_floor() {
        assert_eq!(pixel_to_index(-1), -1);
        assert_eq!(pixel_to_index(-TILE_SIZE), -1);
        assert_eq!(pixel_to_index(-TILE_SIZE - 1), -2);
        assert_eq!(pixel_to_index(0), 0);
        assert_eq!(pixel_to_index(TILE_SIZE - 1), 0);
        assert_eq!(pixel_to_index(TILE_SIZE), 1);
        assert_eq!(pixel_to_index(i32::MIN), i32::MIN / TILE_SIZE);
    }

    #[test]
    fn test_every_pixel_belongs_to_exactly_one_tile() {
        for xy in -3 * TILE_SIZE..3 * TILE_SIZE {
            let ij = pixel_to_index(xy);
            assert!(index_to_pixel(ij) <= xy);
            assert!(xy < index_to_pixel(ij + 1));
        }
    }

    #[test]
    fn test_parent_and_mirror() {
        assert_eq!(TileIndex::new(-3, 5).parent(), TileIndex::new(-2, 2));
        assert_eq!(TileIndex::new(-1, -1).parent(), TileIndex::new(-1, -1));
        let t = TileIndex::new(4, -7);
        assert_eq!(t.mirror(), TileIndex::new(4, 6));
        assert_eq!(t.mirror().mirror(), t);
    }

    #[test]
    fn test_covering_tiles() {
        let rect = PixelRect::around_pan(0, 0, 256, 256);
        let tiles = rect.covering_tiles();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0], TileIndex::new(-1, -1));
        assert_eq!(tiles[3], TileIndex::new(0, 0));
    }

    #[test]
    fn test_odd_rect_keeps_its_size() {
        let rect = PixelRect::around_pan(10, -4, 201, 101);
        assert_eq!((rect.width(), rect.height()), (201, 101));
        assert_eq!((rect.x0, rect.y0), (-110, -46));
        assert_eq!(rect.covering_tiles().len(), 2 * 2);
    }

    #[test]
    fn test_real_pan_conversion() {
        let p = RealPoint::new(-1.5, 0.25);
        let (px, py) = p.to_pan(256.0);
        assert_eq!((px, py), (384, -64));
        let back = RealPoint::from_pan(px, py, 256.0);
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }
}
