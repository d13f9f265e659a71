//! Configuration system for the tile engine
//!
//! Every tunable knob lives in [`ViewerConfig`]. Callers normally pick one of
//! the [`ViewerProfile`] presets and only reach for a custom configuration, or
//! a JSON file, when they need to tweak an individual value.

use crate::core::constants::{
    COARSE_ITER_COEF, FINE_ITER_COEF, FLY_PAN_STEP_DIVISOR, FLY_TICK_MS,
    SNAPSHOT_WAIT_PER_TILE_MS, WORKER_THREAD_NAME,
};
use crate::core::zoom;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerProfile {
    Coarse,
    Fine,
    Custom(ViewerConfig),
}

impl ViewerProfile {
    pub fn resolve(&self) -> ViewerConfig {
        match self {
            Self::Coarse => ViewerConfig {
                iteration: IterationProfile::Coarse,
                ..ViewerConfig::default()
            },
            Self::Fine => ViewerConfig {
                iteration: IterationProfile::Fine,
                ..ViewerConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for ViewerProfile {
    fn default() -> Self {
        Self::Coarse
    }
}

/// Iteration budget preset, see [`zoom::max_iter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationProfile {
    Coarse,
    Fine,
    Custom(u32),
}

impl IterationProfile {
    pub fn coefficient(&self) -> u32 {
        match self {
            Self::Coarse => COARSE_ITER_COEF,
            Self::Fine => FINE_ITER_COEF,
            Self::Custom(coef) => *coef,
        }
    }

    pub fn max_iter(&self, level: u32) -> u32 {
        zoom::max_iter(level, self.coefficient())
    }
}

impl Default for IterationProfile {
    fn default() -> Self {
        Self::Coarse
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name of the worker thread
    pub thread_name: String,
    /// Start with dequeuing suspended until `pause(false)`
    pub start_paused: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: WORKER_THREAD_NAME.to_string(),
            start_paused: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyConfig {
    /// Delay between two ticks of the sequencer
    pub tick_interval_ms: u64,
    /// A pan step moves `TILE_SIZE / pan_step_divisor` pixels
    pub pan_step_divisor: i32,
}

impl FlyConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for FlyConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: FLY_TICK_MS,
            pan_step_divisor: FLY_PAN_STEP_DIVISOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Poll delay per tile still outstanding
    pub wait_per_tile_ms: u64,
}

impl SnapshotConfig {
    pub fn wait_per_tile(&self) -> Duration {
        Duration::from_millis(self.wait_per_tile_ms)
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            wait_per_tile_ms: SNAPSHOT_WAIT_PER_TILE_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Persist the visible tile rasters in saved sessions, not just zoom/pan
    pub persist_tiles: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub iteration: IterationProfile,
    pub scheduler: SchedulerConfig,
    pub fly: FlyConfig,
    pub snapshot: SnapshotConfig,
    pub session: SessionConfig,
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.iteration.coefficient() == 0 {
            return Err(Error::InvalidConfig(
                "iteration coefficient must be positive".to_string(),
            ));
        }
        if self.fly.tick_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "fly tick interval must be positive".to_string(),
            ));
        }
        if self.fly.pan_step_divisor <= 0 {
            return Err(Error::InvalidConfig(
                "fly pan step divisor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_resolve() {
        assert_eq!(ViewerProfile::Coarse.resolve().iteration.coefficient(), 15);
        assert_eq!(ViewerProfile::Fine.resolve().iteration.coefficient(), 30);
        let custom = ViewerConfig {
            iteration: IterationProfile::Custom(50),
            ..ViewerConfig::default()
        };
        assert_eq!(ViewerProfile::Custom(custom.clone()).resolve(), custom);
    }

    #[test]
    fn test_partial_json() {
        let config =
            ViewerConfig::from_json_str(r#"{ "iteration": "fine", "fly": { "tick_interval_ms": 20 } }"#)
                .unwrap();
        assert_eq!(config.iteration, IterationProfile::Fine);
        assert_eq!(config.fly.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.fly.pan_step_divisor, FLY_PAN_STEP_DIVISOR);
        assert!(!config.session.persist_tiles);
    }

    #[test]
    fn test_custom_iteration_json() {
        let config = ViewerConfig::from_json_str(r#"{ "iteration": { "custom": 40 } }"#).unwrap();
        assert_eq!(config.iteration.max_iter(0), 40);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ViewerConfig::from_json_str(r#"{ "iteration": { "custom": 0 } }"#);
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let config = ViewerProfile::Fine.resolve();
        let json = config.to_json_string().unwrap();
        assert_eq!(ViewerConfig::from_json_str(&json).unwrap(), config);
    }
}
