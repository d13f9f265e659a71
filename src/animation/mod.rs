pub mod fly;
pub mod tape;

// Re-export commonly used types for convenience
pub use fly::{FlySequencer, FlyTick, KeepAwake, NoopKeepAwake};
pub use tape::{FlyInstruction, FlyTape};
