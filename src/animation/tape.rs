//! Fly tapes: flat `f64` instruction streams driving the camera tour.
//!
//! Layout, one word per value:
//!
//! | opcode | operands                       |
//! |--------|--------------------------------|
//! | 0      | INIT target_zoom real_x real_y |
//! | 1      | PAN real_x real_y              |
//! | 2      | ZOOM target_zoom               |

use crate::core::geo::RealPoint;
use crate::core::zoom::is_reachable;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const OP_INIT: f64 = 0.0;
pub const OP_PAN: f64 = 1.0;
pub const OP_ZOOM: f64 = 2.0;

/// One decoded tape instruction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FlyInstruction {
    /// Reset the view and cache, then jump to `target_zoom` centred on `target`
    Init { target_zoom: u32, target: RealPoint },
    /// Glide to `target` at constant speed
    Pan { target: RealPoint },
    /// Step the zoom one level per tick until `target_zoom`
    Zoom { target_zoom: u32 },
}

impl FlyInstruction {
    fn encode_into(&self, words: &mut Vec<f64>) {
        match *self {
            Self::Init {
                target_zoom,
                target,
            } => words.extend([OP_INIT, target_zoom as f64, target.x, target.y]),
            Self::Pan { target } => words.extend([OP_PAN, target.x, target.y]),
            Self::Zoom { target_zoom } => words.extend([OP_ZOOM, target_zoom as f64]),
        }
    }
}

static DEMO_TAPE: Lazy<FlyTape> = Lazy::new(|| {
    FlyTape::from_instructions(&[
        FlyInstruction::Init {
            target_zoom: 64,
            target: RealPoint::new(-1.40771, 0.0),
        },
        FlyInstruction::Pan {
            target: RealPoint::new(-1.36963, 0.06470),
        },
        FlyInstruction::Pan {
            target: RealPoint::new(-1.27393, 0.05981),
        },
        FlyInstruction::Pan {
            target: RealPoint::new(-1.15576, 0.27539),
        },
        FlyInstruction::Pan {
            target: RealPoint::new(-0.91699, 0.27222),
        },
    ])
});

/// A camera tour. Instructions are decoded lazily as the sequencer reaches
/// them, so a damaged word only surfaces when it is played.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlyTape {
    words: Vec<f64>,
}

impl FlyTape {
    pub fn new(words: Vec<f64>) -> Self {
        Self { words }
    }

    pub fn from_instructions(instructions: &[FlyInstruction]) -> Self {
        let mut words = Vec::new();
        for instruction in instructions {
            instruction.encode_into(&mut words);
        }
        Self { words }
    }

    /// The built-in tour along the main antenna
    pub fn demo() -> Self {
        DEMO_TAPE.clone()
    }

    pub fn words(&self) -> &[f64] {
        &self.words
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Decode the instruction starting at word `pc`, returning it with the
    /// position of the next one
    pub fn decode_at(&self, pc: usize) -> Result<(FlyInstruction, usize)> {
        let opcode = self.word(pc, pc)?;
        let instruction = if opcode == OP_INIT {
            FlyInstruction::Init {
                target_zoom: self.zoom_operand(pc, pc + 1)?,
                target: RealPoint::new(self.word(pc, pc + 2)?, self.word(pc, pc + 3)?),
            }
        } else if opcode == OP_PAN {
            FlyInstruction::Pan {
                target: RealPoint::new(self.word(pc, pc + 1)?, self.word(pc, pc + 2)?),
            }
        } else if opcode == OP_ZOOM {
            FlyInstruction::Zoom {
                target_zoom: self.zoom_operand(pc, pc + 1)?,
            }
        } else {
            return Err(invalid(pc, format!("unknown opcode {}", opcode)));
        };
        let next = match instruction {
            FlyInstruction::Init { .. } => pc + 4,
            FlyInstruction::Pan { .. } => pc + 3,
            FlyInstruction::Zoom { .. } => pc + 2,
        };
        Ok((instruction, next))
    }

    /// Decode the whole tape
    pub fn instructions(&self) -> Result<Vec<FlyInstruction>> {
        let mut pc = 0;
        let mut out = Vec::new();
        while pc < self.words.len() {
            let (instruction, next) = self.decode_at(pc)?;
            out.push(instruction);
            pc = next;
        }
        Ok(out)
    }

    fn word(&self, pc: usize, at: usize) -> Result<f64> {
        match self.words.get(at) {
            Some(word) if word.is_finite() => Ok(*word),
            Some(word) => Err(invalid(pc, format!("non-finite word {}", word))),
            None => Err(invalid(pc, "truncated instruction".to_string())),
        }
    }

    fn zoom_operand(&self, pc: usize, at: usize) -> Result<u32> {
        let word = self.word(pc, at)?;
        if word < 0.0 || word.fract() != 0.0 || word > u32::MAX as f64 {
            return Err(invalid(pc, format!("bad zoom level {}", word)));
        }
        let level = word as u32;
        if !is_reachable(level) {
            return Err(invalid(pc, format!("unreachable zoom level {}", level)));
        }
        Ok(level)
    }
}

fn invalid(index: usize, reason: String) -> Error {
    Error::InvalidInstruction { index, reason }
}
