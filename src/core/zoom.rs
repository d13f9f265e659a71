//! The zoom level state machine.
//!
//! Levels run 0, 1, 2, 4, 8, ... and each step changes the scale by exactly a
//! factor of two, so a tile at level `n` always covers one quadrant of its
//! ancestor at [`lower_level`]`(n)`.

use crate::core::constants::{BASE_SCALE, MAX_ZOOM_LEVEL};

/// Level reached by zooming in once from `level`; [`MAX_ZOOM_LEVEL`] stays
pub fn zoom_in_level(level: u32) -> u32 {
    if level == 0 {
        1
    } else if level >= MAX_ZOOM_LEVEL {
        level
    } else {
        level * 2
    }
}

/// Level reached by zooming out once from `level`; level 0 stays at 0
pub fn zoom_out_level(level: u32) -> u32 {
    if level > 1 {
        level / 2
    } else {
        0
    }
}

/// Level whose tiles are twice as large as the tiles of `level`
pub fn lower_level(level: u32) -> u32 {
    zoom_out_level(level)
}

/// Whether `level` can be reached through zoom steps
pub fn is_reachable(level: u32) -> bool {
    level == 0 || (level.is_power_of_two() && level <= MAX_ZOOM_LEVEL)
}

/// Number of zoom-out steps from `level` down to level 0
pub fn depth(level: u32) -> u32 {
    u32::BITS - level.leading_zeros()
}

/// Pixels per real unit at `level`
pub fn scale(level: u32) -> f64 {
    if level == 0 {
        BASE_SCALE / 2.0
    } else {
        BASE_SCALE * level as f64
    }
}

/// Iteration budget for `level`: `coef + coef * ln(1 + level)`
pub fn max_iter(level: u32, coef: u32) -> u32 {
    coef + (coef as f64 * (level as f64).ln_1p()) as u32
}
