//! Input events and tracked pointer/keyboard state.
//!
//! Positions are world coordinates; the host converts from screen space.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Mouse button identifiers, numbered like DOM `MouseEvent.button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u8),
}

impl MouseButton {
    pub fn index(self) -> u8 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::Other(n) => n,
        }
    }

    pub fn from_index(index: u8) -> Self {
        match index {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            n => MouseButton::Other(n),
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
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
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }
}

/// Wheel tick direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelDirection {
    Up,
    Down,
}

/// A raw input event delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputEvent {
    KeyDown {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyUp {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseDown {
        button: MouseButton,
        position: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseUp {
        button: MouseButton,
        position: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseMove {
        position: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Wheel {
        direction: WheelDirection,
        position: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
}

impl InputEvent {
    pub fn key_down(key: &str) -> Self {
        InputEvent::KeyDown {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key_up(key: &str) -> Self {
        InputEvent::KeyUp {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn mouse_down(button: MouseButton, position: Point) -> Self {
        InputEvent::MouseDown {
            button,
            position,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn mouse_up(button: MouseButton, position: Point) -> Self {
        InputEvent::MouseUp {
            button,
            position,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn mouse_move(position: Point) -> Self {
        InputEvent::MouseMove {
            position,
            modifiers: Modifiers::NONE,
        }
    }

    /// Same event with different modifiers.
    pub fn with_modifiers(mut self, new: Modifiers) -> Self {
        match &mut self {
            InputEvent::KeyDown { modifiers, .. }
            | InputEvent::KeyUp { modifiers, .. }
            | InputEvent::MouseDown { modifiers, .. }
            | InputEvent::MouseUp { modifiers, .. }
            | InputEvent::MouseMove { modifiers, .. }
            | InputEvent::Wheel { modifiers, .. } => *modifiers = new,
        }
        self
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            InputEvent::KeyDown { modifiers, .. }
            | InputEvent::KeyUp { modifiers, .. }
            | InputEvent::MouseDown { modifiers, .. }
            | InputEvent::MouseUp { modifiers, .. }
            | InputEvent::MouseMove { modifiers, .. }
            | InputEvent::Wheel { modifiers, .. } => *modifiers,
        }
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::MouseDown { position, .. }
            | InputEvent::MouseUp { position, .. }
            | InputEvent::MouseMove { position, .. }
            | InputEvent::Wheel { position, .. } => Some(*position),
            InputEvent::KeyDown { .. } | InputEvent::KeyUp { .. } => None,
        }
    }

    /// True for an Escape key press.
    pub fn is_escape(&self) -> bool {
        matches!(self, InputEvent::KeyDown { key, .. } if key.eq_ignore_ascii_case("escape"))
    }
}

/// Tracks the current input state across events.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Current pointer position.
    pub pointer_position: Point,
    /// Pointer position before the last move.
    pub previous_pointer_position: Point,
    pressed_buttons: HashSet<MouseButton>,
    pressed_keys: HashSet<String>,
    pub modifiers: Modifiers,
    /// Where the left button went down, while it is held.
    pub drag_start: Option<Point>,
    double_click_interval: Duration,
    double_click_distance: f64,
    last_click_time: Option<Instant>,
    last_click_position: Option<Point>,
    /// Set by the left-button release that completed a double-click.
    double_click_detected: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(Duration::from_millis(300), 20.0)
    }
}

impl InputState {
    pub fn new(double_click_interval: Duration, double_click_distance: f64) -> Self {
        Self {
            pointer_position: Point::ZERO,
            previous_pointer_position: Point::ZERO,
            pressed_buttons: HashSet::new(),
            pressed_keys: HashSet::new(),
            modifiers: Modifiers::default(),
            drag_start: None,
            double_click_interval,
            double_click_distance,
            last_click_time: None,
            last_click_position: None,
            double_click_detected: false,
        }
    }

    /// Process an event received now.
    pub fn handle(&mut self, event: &InputEvent) {
        self.handle_at(event, Instant::now());
    }

    /// Process an event received at `now`.
    pub fn handle_at(&mut self, event: &InputEvent, now: Instant) {
        self.double_click_detected = false;
        self.modifiers = event.modifiers();
        match event {
            InputEvent::KeyDown { key, .. } => {
                self.pressed_keys.insert(key.to_lowercase());
            }
            InputEvent::KeyUp { key, .. } => {
                self.pressed_keys.remove(&key.to_lowercase());
            }
            InputEvent::MouseDown { button, position, .. } => {
                self.move_pointer(*position);
                self.pressed_buttons.insert(*button);
                if *button == MouseButton::Left {
                    self.drag_start = Some(*position);
                }
            }
            InputEvent::MouseUp { button, position, .. } => {
                self.move_pointer(*position);
                self.pressed_buttons.remove(button);
                if *button == MouseButton::Left {
                    self.drag_start = None;
                    self.detect_double_click(*position, now);
                }
            }
            InputEvent::MouseMove { position, .. } | InputEvent::Wheel { position, .. } => {
                self.move_pointer(*position);
            }
        }
    }

    fn move_pointer(&mut self, position: Point) {
        self.previous_pointer_position = self.pointer_position;
        self.pointer_position = position;
    }

    fn detect_double_click(&mut self, position: Point, now: Instant) {
        if let (Some(last_time), Some(last_pos)) = (self.last_click_time, self.last_click_position) {
            let elapsed = now.saturating_duration_since(last_time);
            let distance = (position - last_pos).hypot();
            if elapsed <= self.double_click_interval && distance <= self.double_click_distance {
                self.double_click_detected = true;
                // Reset so a triple click is not a second double-click
                self.last_click_time = None;
                self.last_click_position = None;
                return;
            }
        }
        self.last_click_time = Some(now);
        self.last_click_position = Some(position);
    }

    /// Whether the last handled event completed a double-click.
    pub fn double_clicked(&self) -> bool {
        self.double_click_detected
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(&key.to_lowercase())
    }

    /// Pointer movement caused by the last pointer event.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_position - self.previous_pointer_position
    }

    /// Drop held buttons and keys, e.g. when the host window loses focus.
    pub fn reset(&mut self) {
        self.pressed_buttons.clear();
        self.pressed_keys.clear();
        self.drag_start = None;
        self.double_click_detected = false;
    }
}
