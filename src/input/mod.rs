pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{Command, InputEvent, KeyCode};
pub use handler::InputHandler;
