use serde::{Deserialize, Serialize};

/// Raw gestures delivered by the host UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Start of drag operation
    DragStart,
    /// Drag in progress, screen pixels moved since the last event
    Drag { dx: i32, dy: i32 },
    /// End of drag operation
    DragEnd,
    /// Scroll wheel or pinch, positive zooms in
    Scroll { delta: f64 },
    /// Double click/tap
    DoubleClick,
    /// Keyboard input
    KeyPress { key: KeyCode },
    /// Viewport/window resize
    Resize { width: i32, height: i32 },
}

/// Keyboard key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Plus,
    Minus,
    Escape,
    Space,
    Char(char),
    Other(u32),
}

/// Operations the viewer understands, produced from gestures and key
/// bindings or sent directly by a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Move to a pan offset in virtual pixels
    PanTo { x: i32, y: i32 },
    PanStarted,
    PanFinished,
    ZoomIn,
    ZoomOut,
    ZoomTo(u32),
    ClearCache,
    StartFly,
    StopFly,
    /// Export an image, 0 meaning the view size
    StartSnapshot { width: u32, height: u32 },
    Resize { width: i32, height: i32 },
    PanToInterestingPlace,
    Pause(bool),
}

impl Command {
    /// Whether the command changes the zoom level
    pub fn is_zoom(&self) -> bool {
        matches!(self, Self::ZoomIn | Self::ZoomOut | Self::ZoomTo(_))
    }
}
