//! Normalized input event types.
//!
//! The core never talks to a windowing backend directly: the surrounding
//! shell translates its native events into these types and feeds them to
//! `App::run_frame` as a sequence with monotonically non-decreasing
//! timestamps.

use crate::geometry::Point;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Keyboard key, decoupled from any windowing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    F(u8),
}

/// Key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Down,
    Up,
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub kind: KeyKind,
    pub key: Key,
}

// ---------------------------------------------------------------------------
// Pointer
// ---------------------------------------------------------------------------

/// Pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Pointer transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Move,
    Down,
    Up,
}

/// A pointer event in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Point,
    pub button: PointerButton,
}

// ---------------------------------------------------------------------------
// InputEvent
// ---------------------------------------------------------------------------

/// Event payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventPayload {
    Pointer(PointerEvent),
    Key(KeyEvent),
}

/// Top-level input event with a millisecond timestamp.
///
/// Timestamps are monotonically non-decreasing within the sequence handed to
/// one frame; the core only uses them for ordering and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub timestamp_ms: u64,
    pub payload: EventPayload,
}

impl InputEvent {
    /// A pointer-move event with the primary button state.
    pub fn pointer_move(timestamp_ms: u64, position: Point) -> Self {
        Self {
            timestamp_ms,
            payload: EventPayload::Pointer(PointerEvent {
                kind: PointerKind::Move,
                position,
                button: PointerButton::Primary,
            }),
        }
    }

    /// A primary-button press at `position`.
    pub fn pointer_down(timestamp_ms: u64, position: Point) -> Self {
        Self {
            timestamp_ms,
            payload: EventPayload::Pointer(PointerEvent {
                kind: PointerKind::Down,
                position,
                button: PointerButton::Primary,
            }),
        }
    }

    /// A primary-button release at `position`.
    pub fn pointer_up(timestamp_ms: u64, position: Point) -> Self {
        Self {
            timestamp_ms,
            payload: EventPayload::Pointer(PointerEvent {
                kind: PointerKind::Up,
                position,
                button: PointerButton::Primary,
            }),
        }
    }

    /// A key-down event.
    pub fn key_down(timestamp_ms: u64, key: Key) -> Self {
        Self {
            timestamp_ms,
            payload: EventPayload::Key(KeyEvent { kind: KeyKind::Down, key }),
        }
    }

    /// A key-up event.
    pub fn key_up(timestamp_ms: u64, key: Key) -> Self {
        Self {
            timestamp_ms,
            payload: EventPayload::Key(KeyEvent { kind: KeyKind::Up, key }),
        }
    }
}

// ---------------------------------------------------------------------------
// EventResult
// ---------------------------------------------------------------------------

/// What a widget's event handler did with an event.
///
/// `Consumed` stops bubbling; `Ignored` offers the event to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Consumed,
    Ignored,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_constructors() {
        let down = InputEvent::pointer_down(10, Point::new(3.0, 4.0));
        match down.payload {
            EventPayload::Pointer(p) => {
                assert_eq!(p.kind, PointerKind::Down);
                assert_eq!(p.position, Point::new(3.0, 4.0));
                assert_eq!(p.button, PointerButton::Primary);
            }
            _ => panic!("expected pointer payload"),
        }
        assert_eq!(down.timestamp_ms, 10);
    }

    #[test]
    fn key_constructors() {
        let ev = InputEvent::key_down(5, Key::Enter);
        match ev.payload {
            EventPayload::Key(k) => {
                assert_eq!(k.kind, KeyKind::Down);
                assert_eq!(k.key, Key::Enter);
            }
            _ => panic!("expected key payload"),
        }
        let up = InputEvent::key_up(6, Key::Char('a'));
        assert!(matches!(up.payload, EventPayload::Key(KeyEvent { kind: KeyKind::Up, .. })));
    }

    #[test]
    fn events_are_comparable() {
        let a = InputEvent::pointer_move(1, Point::ZERO);
        let b = InputEvent::pointer_move(1, Point::ZERO);
        assert_eq!(a, b);
    }
}
