//! Save and restore of the viewer state between runs.
//!
//! The outer record is JSON. Persisted tiles travel inside it as opaque
//! bincode blobs so a single damaged tile can be dropped without losing the
//! rest of the session.

use crate::core::constants::TILE_SIZE;
use crate::core::geo::TileIndex;
use crate::core::zoom::is_reachable;
use crate::tiles::tile::{Tile, TileRaster};
use crate::{Error, Result};
use image::ImageBuffer;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub zoom_level: u32,
    pub pan_x: i32,
    pub pan_y: i32,
    /// Encoded [`TileRecord`]s, empty unless tile persistence is enabled
    #[serde(default)]
    pub tiles: Vec<Vec<u8>>,
}

impl SessionState {
    pub fn new(zoom_level: u32, pan_x: i32, pan_y: i32) -> Self {
        Self {
            zoom_level,
            pan_x,
            pan_y,
            tiles: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Append an encoded record of `tile`
    pub fn push_tile(&mut self, tile: &Tile) -> Result<()> {
        self.tiles.push(TileRecord::from_tile(tile).encode()?);
        Ok(())
    }

    /// Decode every persisted tile, skipping the malformed ones
    pub fn restored_tiles(&self) -> Vec<Tile> {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(n, bytes)| {
                match TileRecord::decode(bytes).and_then(TileRecord::into_tile) {
                    Ok(tile) => Some(tile),
                    Err(e) => {
                        log::debug!("skipping tile record {}: {}", n, e);
                        None
                    }
                }
            })
            .collect()
    }
}

/// One persisted tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub zoom_level: u32,
    pub i: i32,
    pub j: i32,
    pub max_iter: u32,
    pub completed: bool,
    /// Raw RGBA bytes, row-major
    pub pixels: Option<Vec<u8>>,
}

impl TileRecord {
    pub fn from_tile(tile: &Tile) -> Self {
        Self {
            zoom_level: tile.zoom_level(),
            i: tile.i(),
            j: tile.j(),
            max_iter: tile.max_iter(),
            completed: tile.is_completed(),
            pixels: tile.with_raster(|raster| raster.as_raw().clone()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Rebuild the tile, validating the level and raster size
    pub fn into_tile(self) -> Result<Tile> {
        if !is_reachable(self.zoom_level) {
            return Err(Error::MalformedRecord(format!(
                "zoom level {} is not reachable",
                self.zoom_level
            )));
        }
        let raster = match self.pixels {
            Some(pixels) => {
                let len = pixels.len();
                let raster: Option<TileRaster> =
                    ImageBuffer::from_raw(TILE_SIZE as u32, TILE_SIZE as u32, pixels);
                Some(raster.ok_or_else(|| {
                    Error::MalformedRecord(format!("raster of {} bytes", len))
                })?)
            }
            None => None,
        };
        Ok(Tile::restored(
            self.zoom_level,
            TileIndex::new(self.i, self.j),
            self.max_iter,
            raster,
            self.completed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::tile::solid_raster;
    use image::Rgba;

    #[test]
    fn test_zoom_and_pan_only() {
        let state = SessionState::new(16, -300, 42);
        let json = state.to_json().unwrap();
        assert!(json.contains("\"zoom_level\":16"));
        let back = SessionState::from_json(&json).unwrap();
        assert_eq!(back, state);
        assert!(back.restored_tiles().is_empty());
    }

    #[test]
    fn test_tiles_without_field_default_to_empty() {
        let state = SessionState::from_json(r#"{"zoom_level":2,"pan_x":1,"pan_y":2}"#).unwrap();
        assert!(state.tiles.is_empty());
    }

    #[test]
    fn test_restore_tile_records() {
        let tile = Tile::new(4, -3, 5, 30);
        tile.complete(solid_raster(Rgba([10, 20, 30, 255])));
        let mut state = SessionState::new(4, 0, 0);
        state.push_tile(&tile).unwrap();

        let restored = state.restored_tiles();
        assert_eq!(restored.len(), 1);
        let back = &restored[0];
        assert_eq!(back.key(), tile.key());
        assert!(back.is_completed());
        assert_eq!(back.raster(), tile.raster());
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let good = Tile::new(0, 0, 0, 15);
        good.complete(solid_raster(Rgba([1, 1, 1, 255])));

        let short = TileRecord {
            zoom_level: 1,
            i: 0,
            j: 0,
            max_iter: 15,
            completed: true,
            pixels: Some(vec![0; 12]),
        };
        let bad_level = TileRecord {
            zoom_level: 3,
            pixels: None,
            ..short.clone()
        };

        let mut state = SessionState::new(0, 0, 0);
        state.tiles.push(vec![0xff, 0x01]);
        state.tiles.push(short.encode().unwrap());
        state.tiles.push(bad_level.encode().unwrap());
        state.push_tile(&good).unwrap();

        let restored = state.restored_tiles();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].key(), good.key());
    }

    #[test]
    fn test_completed_without_raster_restores_incomplete() {
        let record = TileRecord {
            zoom_level: 2,
            i: 1,
            j: 1,
            max_iter: 20,
            completed: true,
            pixels: None,
        };
        let tile = record.into_tile().unwrap();
        assert!(!tile.is_completed());
    }
}
