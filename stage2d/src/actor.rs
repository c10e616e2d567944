//! Keyboard-driven movement for actors.

use winit::keyboard::KeyCode;

use crate::input::{KeyEvent, KeyState};
use crate::math::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector in world space (Y up).
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, 1.0),
            Direction::Down => Vec2::new(0.0, -1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }

    fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

/// Which key codes drive each direction. A code may appear under several directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    keys: [Vec<KeyCode>; 4],
}

impl KeyBindings {
    /// No keys bound.
    pub fn empty() -> Self {
        Self {
            keys: Default::default(),
        }
    }

    pub fn bind(&mut self, direction: Direction, key: KeyCode) {
        let keys = &mut self.keys[direction.index()];
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    #[must_use]
    pub fn with(mut self, direction: Direction, key: KeyCode) -> Self {
        self.bind(direction, key);
        self
    }

    /// Replace the keys bound to `direction`.
    pub fn set(&mut self, direction: Direction, keys: impl IntoIterator<Item = KeyCode>) {
        self.keys[direction.index()] = keys.into_iter().collect();
    }

    pub fn keys(&self, direction: Direction) -> &[KeyCode] {
        &self.keys[direction.index()]
    }

    /// First direction bound to `key`, checked in `Direction::ALL` order.
    pub fn direction_for(&self, key: KeyCode) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| self.keys[direction.index()].contains(&key))
    }
}

impl Default for KeyBindings {
    /// Arrow keys and WASD.
    fn default() -> Self {
        Self::empty()
            .with(Direction::Up, KeyCode::ArrowUp)
            .with(Direction::Up, KeyCode::KeyW)
            .with(Direction::Down, KeyCode::ArrowDown)
            .with(Direction::Down, KeyCode::KeyS)
            .with(Direction::Left, KeyCode::ArrowLeft)
            .with(Direction::Left, KeyCode::KeyA)
            .with(Direction::Right, KeyCode::ArrowRight)
            .with(Direction::Right, KeyCode::KeyD)
    }
}

/// The outcome of a routed key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Stop(Direction),
}

/// Input-bound component of an actor: key map, speed and action state.
#[derive(Clone, Debug, PartialEq)]
pub struct Controller {
    pub bindings: KeyBindings,
    pub move_speed: f32,
    held: [bool; 4],
    last_action: Option<Action>,
}

impl Controller {
    pub fn new(move_speed: f32) -> Self {
        Self::with_bindings(move_speed, KeyBindings::default())
    }

    pub fn with_bindings(move_speed: f32, bindings: KeyBindings) -> Self {
        Self {
            bindings,
            move_speed,
            held: [false; 4],
            last_action: None,
        }
    }

    pub fn last_action(&self) -> Option<Action> {
        self.last_action
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.held[direction.index()]
    }

    /// Directions currently held, in `Direction::ALL` order. Empty means "none".
    pub fn held(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL
            .into_iter()
            .filter(|direction| self.is_held(*direction))
    }

    /// Map a key event to the action it would trigger, without applying it.
    pub fn action_for(&self, event: &KeyEvent) -> Option<Action> {
        let direction = self.bindings.direction_for(event.code)?;
        Some(match event.state {
            KeyState::Down => Action::Move(direction),
            KeyState::Up => Action::Stop(direction),
        })
    }

    /// Apply a key event to `velocity`. Returns the action when it took effect.
    ///
    /// Repeating the previous action is ignored, so auto-repeated key-downs do nothing.
    /// A `Stop` only zeroes its axis while the velocity still points the stopped way, so
    /// releasing one key does not cancel a still-held opposite key.
    pub fn handle_key(&mut self, event: &KeyEvent, velocity: &mut Vec2) -> Option<Action> {
        let action = self.action_for(event)?;
        if self.last_action == Some(action) {
            return None;
        }
        self.last_action = Some(action);

        match action {
            Action::Move(direction) => {
                self.held[direction.index()] = true;
                let target = direction.unit() * self.move_speed;
                match direction {
                    Direction::Left | Direction::Right => velocity.x = target.x,
                    Direction::Up | Direction::Down => velocity.y = target.y,
                }
            }
            Action::Stop(direction) => {
                self.held[direction.index()] = false;
                let unit = direction.unit();
                match direction {
                    Direction::Left | Direction::Right => {
                        if velocity.x * unit.x > 0.0 {
                            velocity.x = 0.0;
                        }
                    }
                    Direction::Up | Direction::Down => {
                        if velocity.y * unit.y > 0.0 {
                            velocity.y = 0.0;
                        }
                    }
                }
            }
        }

        Some(action)
    }
}
