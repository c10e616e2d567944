use std::collections::HashSet;

use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::math::Vec2;

/// Whether a key went down or up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    Down,
    Up,
}

/// A raw keyboard event, delivered verbatim to key subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub state: KeyState,
    pub code: KeyCode,
    /// Auto-repeat from a held key. Still delivered; subscribers decide what to do with it.
    pub repeat: bool,
}

impl KeyEvent {
    pub fn down(code: KeyCode) -> Self {
        Self {
            state: KeyState::Down,
            code,
            repeat: false,
        }
    }

    pub fn up(code: KeyCode) -> Self {
        Self {
            state: KeyState::Up,
            code,
            repeat: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Move,
    Down,
    Up,
    Enter,
    Leave,
    Click,
}

/// A raw pointer event. `position` is in client coordinates (window pixels, Y down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub button: Option<MouseButton>,
    pub position: Vec2,
}

impl MouseEvent {
    pub fn new(kind: MouseEventKind, button: Option<MouseButton>, position: Vec2) -> Self {
        Self {
            kind,
            button,
            position,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
}

/// Turns winit window events into [`InputEvent`]s.
///
/// Button events carry no position in winit, so the last cursor position is remembered.
/// A `Click` follows an `Up` when the same button went down inside the window.
pub struct InputTranslator {
    cursor: Vec2,
    pressed: HashSet<MouseButton>,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self {
            cursor: Vec2::ZERO,
            pressed: HashSet::new(),
        }
    }

    /// Last known cursor position in client coordinates.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    pub fn translate(&mut self, event: &WindowEvent) -> Vec<InputEvent> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => {
                    let state = match event.state {
                        ElementState::Pressed => KeyState::Down,
                        ElementState::Released => KeyState::Up,
                    };
                    vec![InputEvent::Key(KeyEvent {
                        state,
                        code,
                        repeat: event.repeat,
                    })]
                }
                PhysicalKey::Unidentified(_) => Vec::new(),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                vec![self.mouse(MouseEventKind::Move, None)]
            }
            WindowEvent::CursorEntered { .. } => vec![self.mouse(MouseEventKind::Enter, None)],
            WindowEvent::CursorLeft { .. } => {
                self.pressed.clear();
                vec![self.mouse(MouseEventKind::Leave, None)]
            }
            WindowEvent::MouseInput { state, button, .. } => self.button(*button, *state),
            _ => Vec::new(),
        }
    }

    /// Translate a button transition at the remembered cursor position.
    pub fn button(&mut self, button: MouseButton, state: ElementState) -> Vec<InputEvent> {
        match state {
            ElementState::Pressed => {
                self.pressed.insert(button);
                vec![self.mouse(MouseEventKind::Down, Some(button))]
            }
            ElementState::Released => {
                let mut events = vec![self.mouse(MouseEventKind::Up, Some(button))];
                if self.pressed.remove(&button) {
                    events.push(self.mouse(MouseEventKind::Click, Some(button)));
                }
                events
            }
        }
    }

    /// Record a cursor move and translate it.
    pub fn cursor_moved(&mut self, position: Vec2) -> InputEvent {
        self.cursor = position;
        self.mouse(MouseEventKind::Move, None)
    }

    fn mouse(&self, kind: MouseEventKind, button: Option<MouseButton>) -> InputEvent {
        InputEvent::Mouse(MouseEvent::new(kind, button, self.cursor))
    }
}

impl Default for InputTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_after_press_emits_click() {
        let mut translator = InputTranslator::new();
        translator.cursor_moved(Vec2::new(12.0, 30.0));

        let down = translator.button(MouseButton::Middle, ElementState::Pressed);
        assert_eq!(
            down,
            vec![InputEvent::Mouse(MouseEvent::new(
                MouseEventKind::Down,
                Some(MouseButton::Middle),
                Vec2::new(12.0, 30.0)
            ))]
        );

        let up = translator.button(MouseButton::Middle, ElementState::Released);
        let kinds: Vec<_> = up
            .iter()
            .map(|event| match event {
                InputEvent::Mouse(mouse) => mouse.kind,
                InputEvent::Key(_) => panic!("unexpected key event"),
            })
            .collect();
        assert_eq!(kinds, vec![MouseEventKind::Up, MouseEventKind::Click]);
    }

    #[test]
    fn release_without_press_is_not_a_click() {
        let mut translator = InputTranslator::new();
        let up = translator.button(MouseButton::Left, ElementState::Released);
        assert_eq!(up.len(), 1);
    }

    #[test]
    fn button_events_use_last_cursor_position() {
        let mut translator = InputTranslator::new();
        translator.cursor_moved(Vec2::new(3.0, 4.0));
        translator.cursor_moved(Vec2::new(50.0, 60.0));
        let events = translator.button(MouseButton::Left, ElementState::Pressed);
        match events.as_slice() {
            [InputEvent::Mouse(mouse)] => assert_eq!(mouse.position, Vec2::new(50.0, 60.0)),
            other => panic!("unexpected events {other:?}"),
        }
        assert_eq!(translator.cursor(), Vec2::new(50.0, 60.0));
    }
}
