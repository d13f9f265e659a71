//! Per-pixel iteration kernel and the palette that colours its output.

use crate::core::constants::TILE_SIZE;
use crate::core::zoom::scale;
use crate::tiles::tile::{Tile, TileRaster};
use image::{ImageBuffer, Rgba};
use serde::{Deserialize, Serialize};

/// Computes the final pixels of a tile.
///
/// Runs on the scheduler's worker thread. Implementations are treated as
/// infallible black boxes.
pub trait TileKernel: Send + Sync {
    fn render(&self, tile: &Tile) -> TileRaster;
}

/// Maps an escape iteration count to a colour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Palette {
    /// Smooth polynomial ramp, black inside the set
    Bernstein,
    /// Grey levels, black inside the set
    Grayscale,
}

impl Palette {
    pub fn color(&self, iterations: u32, max_iter: u32) -> Rgba<u8> {
        if iterations >= max_iter {
            return Rgba([0, 0, 0, 255]);
        }
        let t = iterations as f64 / max_iter as f64;
        match self {
            Self::Bernstein => {
                let u = 1.0 - t;
                let r = 9.0 * u * t * t * t;
                let g = 15.0 * u * u * t * t;
                let b = 8.5 * u * u * u * t;
                Rgba([channel(r), channel(g), channel(b), 255])
            }
            Self::Grayscale => {
                let v = channel(t);
                Rgba([v, v, v, 255])
            }
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::Bernstein
    }
}

fn channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

/// Escape-time Mandelbrot kernel.
///
/// Each pixel samples the complex point at its centre, which makes tile
/// `(i, j)` the exact vertical reflection of tile `(i, -j - 1)`.
#[derive(Debug, Clone, Default)]
pub struct MandelbrotKernel {
    pub palette: Palette,
}

impl MandelbrotKernel {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    /// Escape iteration count of `c = cx + i*cy`, `max_iter` if it never escapes
    pub fn iterate(cx: f64, cy: f64, max_iter: u32) -> u32 {
        let (mut zr, mut zi) = (0.0f64, 0.0f64);
        let mut n = 0;
        while n < max_iter {
            let zr2 = zr * zr;
            let zi2 = zi * zi;
            if zr2 + zi2 > 4.0 {
                break;
            }
            zi = 2.0 * zr * zi + cy;
            zr = zr2 - zi2 + cx;
            n += 1;
        }
        n
    }
}

impl TileKernel for MandelbrotKernel {
    fn render(&self, tile: &Tile) -> TileRaster {
        let scale = scale(tile.zoom_level());
        let x0 = tile.virtual_x() as f64;
        let y0 = tile.virtual_y() as f64;
        let max_iter = tile.max_iter();
        ImageBuffer::from_fn(TILE_SIZE as u32, TILE_SIZE as u32, |x, y| {
            let cx = (x0 + x as f64 + 0.5) / scale;
            let cy = (y0 + y as f64 + 0.5) / scale;
            self.palette.color(Self::iterate(cx, cy, max_iter), max_iter)
        })
    }
}
