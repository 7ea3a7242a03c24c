//! Pointer and keyboard events as delivered by the host.
//!
//! Positions are in screen space (CSS pixels). Move and up events are
//! expected from window-level listeners while a gesture holds pointer
//! capture, so they may lie outside every rendered page.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    /// The platform took the pointer away (touch cancel, lost capture,
    /// window blur).
    Cancel,
}

impl PointerEvent {
    pub fn down(x: f64, y: f64) -> Self {
        Self::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::Up {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::Move {
            position: Point::new(x, y),
        }
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position } => Some(*position),
            PointerEvent::Cancel => None,
        }
    }
}

/// Keyboard event type. Key names follow the DOM `KeyboardEvent.key` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

impl KeyEvent {
    pub fn pressed(key: &str) -> Self {
        Self::Pressed(key.to_string())
    }

    /// Whether this is a press of the named key.
    pub fn is_press_of(&self, key: &str) -> bool {
        matches!(self, KeyEvent::Pressed(pressed) if pressed == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position() {
        assert_eq!(PointerEvent::down(1.0, 2.0).position(), Some(Point::new(1.0, 2.0)));
        assert_eq!(PointerEvent::moved(3.0, 4.0).position(), Some(Point::new(3.0, 4.0)));
        assert_eq!(PointerEvent::Cancel.position(), None);
    }

    #[test]
    fn test_key_press_matching() {
        assert!(KeyEvent::pressed("Escape").is_press_of("Escape"));
        assert!(!KeyEvent::Released("Escape".to_string()).is_press_of("Escape"));
        assert!(!KeyEvent::pressed("Delete").is_press_of("Escape"));
    }
}
