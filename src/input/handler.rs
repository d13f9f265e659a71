use crate::input::events::{Command, InputEvent, KeyCode};

/// Turns host gestures and key presses into [`Command`]s.
///
/// Bindings: `+`/`I` zoom in, `-`/`O` zoom out, `S` next point of interest,
/// `C` clear the cache, `F` toggle fly mode.
#[derive(Debug, Clone)]
pub struct InputHandler {
    pub enabled: bool,
    pub zoom_on_wheel: bool,
    pub zoom_on_double_click: bool,
    pub pan_on_drag: bool,
    dragging: bool,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            enabled: true,
            zoom_on_wheel: true,
            zoom_on_double_click: true,
            pan_on_drag: true,
            dragging: false,
        }
    }

    /// Command bound to `key`, if any. `fly_running` decides which way the
    /// fly toggle goes.
    pub fn command_for_key(key: KeyCode, fly_running: bool) -> Option<Command> {
        match key {
            KeyCode::Plus => Some(Command::ZoomIn),
            KeyCode::Minus => Some(Command::ZoomOut),
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                '+' | 'i' => Some(Command::ZoomIn),
                '-' | 'o' => Some(Command::ZoomOut),
                's' => Some(Command::PanToInterestingPlace),
                'c' => Some(Command::ClearCache),
                'f' if fly_running => Some(Command::StopFly),
                'f' => Some(Command::StartFly),
                _ => None,
            },
            _ => None,
        }
    }

    /// Map one host event to commands, given the current pan offset
    pub fn handle_event(
        &mut self,
        event: InputEvent,
        pan: (i32, i32),
        fly_running: bool,
    ) -> Vec<Command> {
        if !self.enabled {
            return vec![];
        }

        let mut commands = vec![];
        match event {
            InputEvent::DragStart => {
                if self.pan_on_drag {
                    self.dragging = true;
                    commands.push(Command::PanStarted);
                }
            }
            InputEvent::Drag { dx, dy } => {
                if self.pan_on_drag && self.dragging {
                    commands.push(Command::PanTo {
                        x: pan.0 + dx,
                        y: pan.1 + dy,
                    });
                }
            }
            InputEvent::DragEnd => {
                if self.dragging {
                    self.dragging = false;
                    commands.push(Command::PanFinished);
                }
            }
            InputEvent::Scroll { delta } => {
                if self.zoom_on_wheel && delta != 0.0 {
                    commands.push(if delta > 0.0 {
                        Command::ZoomIn
                    } else {
                        Command::ZoomOut
                    });
                }
            }
            InputEvent::DoubleClick => {
                if self.zoom_on_double_click {
                    commands.push(Command::ZoomIn);
                }
            }
            InputEvent::KeyPress { key } => {
                commands.extend(Self::command_for_key(key, fly_running));
            }
            InputEvent::Resize { width, height } => {
                commands.push(Command::Resize { width, height });
            }
        }
        commands
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
