//! Input events and dispatch.
//!
//! [`input`] defines the normalized event types the core consumes; the
//! windowing layer that produces them is an external capability. [`dispatch`]
//! routes pointer and key events through the widget tree with hit-testing,
//! bubbling, and the per-widget hover/press state machine.

pub mod dispatch;
pub mod input;

pub use dispatch::Dispatcher;
pub use input::{EventPayload, EventResult, InputEvent, Key, KeyEvent, KeyKind, PointerButton, PointerEvent, PointerKind};
