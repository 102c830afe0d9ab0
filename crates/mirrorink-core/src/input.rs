//! Pointer and keyboard dispatch into a drawing session.

use crate::camera::WHEEL_ZOOM_STEP;
use crate::session::{DrawingSession, Interaction};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in container coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    Scroll { position: Point, delta: Vec2 },
}

/// Keyboard event, keys named as in the DOM `KeyboardEvent.key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "lowercase")]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

/// Translates raw input into session operations.
///
/// Left button draws with the current tool. Middle button, or shift with the
/// left button, pans. The wheel zooms about the cursor.
#[derive(Debug, Clone, Default)]
pub struct InputController {
    pub modifiers: Modifiers,
    pointer_position: Point,
    left_down: bool,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    /// Last pointer position in container coordinates.
    pub fn pointer_position(&self) -> Point {
        self.pointer_position
    }

    /// Process a pointer event.
    pub fn handle_pointer(&mut self, session: &mut DrawingSession, event: PointerEvent) {
        match event {
            PointerEvent::Down { position, button } => {
                self.pointer_position = position;
                let pan = button == MouseButton::Middle || (button == MouseButton::Left && self.modifiers.shift);
                if pan {
                    session.start_pan(position);
                    return;
                }
                if button != MouseButton::Left {
                    return;
                }
                self.left_down = true;
                let point = session.to_logical(position);
                if session.settings().drawing_tool.is_drag_shape() {
                    session.start_shape(point);
                } else {
                    session.add_polygon_point(point);
                }
            }
            PointerEvent::Move { position } => {
                self.pointer_position = position;
                if session.is_panning() {
                    session.update_pan(position);
                    return;
                }
                let point = session.to_logical(position);
                match session.interaction() {
                    Interaction::DrawingShape { .. } if self.left_down => session.update_shape(point),
                    Interaction::DrawingPolygon { .. } => session.update_polygon_preview(point),
                    _ => {}
                }
            }
            PointerEvent::Up { position, button } => {
                self.pointer_position = position;
                if session.is_panning() {
                    session.end_pan();
                    return;
                }
                if button != MouseButton::Left {
                    return;
                }
                self.left_down = false;
                if matches!(session.interaction(), Interaction::DrawingShape { .. }) {
                    let point = session.to_logical(position);
                    session.finish_shape(point);
                }
            }
            PointerEvent::Scroll { position, delta } => {
                self.pointer_position = position;
                session.zoom_wheel(delta.y, position);
            }
        }
    }

    /// Process a key event.
    pub fn handle_key(&mut self, session: &mut DrawingSession, event: KeyEvent) {
        let (key, pressed) = match &event {
            KeyEvent::Pressed(key) => (key.as_str(), true),
            KeyEvent::Released(key) => (key.as_str(), false),
        };
        match key {
            "Shift" => self.modifiers.shift = pressed,
            "Control" => self.modifiers.ctrl = pressed,
            "Alt" => self.modifiers.alt = pressed,
            "Meta" => self.modifiers.meta = pressed,
            _ if pressed => self.handle_shortcut(session, key),
            _ => {}
        }
    }

    fn handle_shortcut(&mut self, session: &mut DrawingSession, key: &str) {
        let command = self.modifiers.command();
        match key {
            "Escape" => session.cancel_interaction(),
            "Enter" => {
                session.finish_polygon();
            }
            "z" | "Z" if command && self.modifiers.shift => {
                session.redo();
            }
            "z" | "Z" if command => {
                session.undo();
            }
            "y" | "Y" if command => {
                session.redo();
            }
            "0" if command => session.reset_zoom_and_pan(),
            "=" | "+" if command => session.zoom_on_center(WHEEL_ZOOM_STEP),
            "-" if command => session.zoom_on_center(-WHEEL_ZOOM_STEP),
            _ => log::trace!("Unhandled key: {}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DrawingTool, MirrorMode, Settings};
    use kurbo::Size;

    /// 80x60 canvas shown 2:1 in a 168x128 container, no mirroring.
    fn setup(tool: DrawingTool) -> (InputController, DrawingSession) {
        let settings = Settings {
            drawing_tool: tool,
            mirror_mode: MirrorMode::None,
            ..Settings::default()
        };
        let mut session = DrawingSession::with_scale(settings, 40);
        session.attach_viewport(Size::new(168.0, 128.0));
        (InputController::new(), session)
    }

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn up(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn moved(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
        }
    }

    fn press(key: &str) -> KeyEvent {
        KeyEvent::Pressed(key.to_string())
    }

    #[test]
    fn test_drag_draws_circle() {
        let (mut input, mut session) = setup(DrawingTool::Circle);
        input.handle_pointer(&mut session, down(40.0, 40.0));
        assert_eq!(
            session.interaction(),
            &Interaction::DrawingShape {
                start: Point::new(20.0, 20.0),
                current: Point::new(20.0, 20.0)
            }
        );
        input.handle_pointer(&mut session, moved(60.0, 40.0));
        input.handle_pointer(&mut session, up(60.0, 40.0));

        assert!(!session.is_drawing());
        assert_eq!(session.history_len(), 2);
        assert_eq!(session.composite().pixel(30, 20), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_clicks_build_polygon() {
        let (mut input, mut session) = setup(DrawingTool::Polygon);
        for (x, y) in [(20.0, 20.0), (60.0, 20.0), (40.0, 50.0)] {
            input.handle_pointer(&mut session, down(x, y));
            input.handle_pointer(&mut session, up(x, y));
        }
        input.handle_pointer(&mut session, moved(30.0, 60.0));
        assert_eq!(session.polygon_points().len(), 3);

        input.handle_key(&mut session, press("Enter"));
        assert!(!session.is_drawing());
        assert_eq!(session.history_len(), 2);
    }

    #[test]
    fn test_escape_cancels_polygon() {
        let (mut input, mut session) = setup(DrawingTool::Polygon);
        input.handle_pointer(&mut session, down(20.0, 20.0));
        input.handle_pointer(&mut session, moved(60.0, 60.0));
        assert!(session.has_content());

        input.handle_key(&mut session, press("Escape"));
        assert!(!session.is_drawing());
        assert!(!session.has_content());
    }

    #[test]
    fn test_middle_button_pans() {
        let (mut input, mut session) = setup(DrawingTool::Circle);
        input.handle_pointer(
            &mut session,
            PointerEvent::Down {
                position: Point::new(10.0, 10.0),
                button: MouseButton::Middle,
            },
        );
        input.handle_pointer(&mut session, moved(30.0, 25.0));
        input.handle_pointer(
            &mut session,
            PointerEvent::Up {
                position: Point::new(30.0, 25.0),
                button: MouseButton::Middle,
            },
        );
        assert_eq!(session.camera().offset, Vec2::new(20.0, 15.0));
        assert!(!session.is_panning());
        assert!(!session.is_drawing());
    }

    #[test]
    fn test_shift_drag_pans_instead_of_drawing() {
        let (mut input, mut session) = setup(DrawingTool::Circle);
        input.handle_key(&mut session, press("Shift"));
        input.handle_pointer(&mut session, down(10.0, 10.0));
        assert!(session.is_panning());
        assert!(!session.is_drawing());

        input.handle_key(&mut session, KeyEvent::Released("Shift".to_string()));
        assert!(!input.modifiers.shift);
    }

    #[test]
    fn test_wheel_zooms() {
        let (mut input, mut session) = setup(DrawingTool::Circle);
        input.handle_pointer(
            &mut session,
            PointerEvent::Scroll {
                position: Point::new(50.0, 50.0),
                delta: Vec2::new(0.0, -1.0),
            },
        );
        assert!((session.camera().zoom() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_undo_redo_shortcuts() {
        let (mut input, mut session) = setup(DrawingTool::Circle);
        input.handle_pointer(&mut session, down(40.0, 40.0));
        input.handle_pointer(&mut session, up(60.0, 40.0));
        assert!(session.has_content());

        input.handle_key(&mut session, press("Control"));
        input.handle_key(&mut session, press("z"));
        assert!(!session.has_content());
        input.handle_key(&mut session, press("y"));
        assert!(session.has_content());

        input.handle_key(&mut session, press("z"));
        input.handle_key(&mut session, press("Shift"));
        input.handle_key(&mut session, press("Z"));
        assert!(session.has_content());
    }

    #[test]
    fn test_event_json() {
        let event: PointerEvent =
            serde_json::from_str(r#"{"type":"down","position":{"x":1.0,"y":2.0},"button":"left"}"#).unwrap();
        assert_eq!(event, down(1.0, 2.0));

        let key: KeyEvent = serde_json::from_str(r#"{"type":"pressed","key":"Escape"}"#).unwrap();
        assert_eq!(key, press("Escape"));
    }
}
