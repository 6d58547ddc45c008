//! Event routing: hit-testing, bubbling, hover/press tracking.
//!
//! Pointer events are offered to the deepest hit-tested widget first and
//! bubble toward the root until a handler consumes them (no capture phase).
//! Independently of user handlers, the dispatcher drives each widget's
//! interaction state machine: `Idle -> Hovered -> Pressed -> Idle`, firing
//! the click handler only when a press is released inside the widget's
//! current bounds.

use crate::geometry::Point;
use crate::invalidate::InvalidationTracker;
use crate::tree::{Interaction, WidgetId, WidgetTree};

use super::input::{EventPayload, EventResult, InputEvent, PointerKind};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes input events through the tree and owns cross-event pointer state.
#[derive(Debug, Default)]
pub struct Dispatcher {
    hovered: Option<WidgetId>,
    pressed: Option<WidgetId>,
}

impl Dispatcher {
    /// Create a dispatcher with no pointer state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The widget currently under the pointer, if any.
    pub fn hovered(&self) -> Option<WidgetId> {
        self.hovered
    }

    /// The widget currently holding an active press, if any.
    pub fn pressed(&self) -> Option<WidgetId> {
        self.pressed
    }

    /// Forget any reference to a widget that is being destroyed.
    pub fn forget(&mut self, id: WidgetId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        if self.pressed == Some(id) {
            self.pressed = None;
        }
    }

    /// Route one event. Widgets whose visual state changed (hover/press
    /// transitions) are marked paint-dirty in the tracker.
    pub fn dispatch(
        &mut self,
        tree: &mut WidgetTree,
        tracker: &mut InvalidationTracker,
        event: &InputEvent,
    ) {
        match event.payload {
            EventPayload::Pointer(pointer) => match pointer.kind {
                PointerKind::Move => self.pointer_move(tree, tracker, pointer.position, event),
                PointerKind::Down => self.pointer_down(tree, tracker, pointer.position, event),
                PointerKind::Up => self.pointer_up(tree, tracker, pointer.position, event),
            },
            EventPayload::Key(_) => self.key_event(tree, event),
        }
    }

    // ── Pointer ──────────────────────────────────────────────────────

    fn pointer_move(
        &mut self,
        tree: &mut WidgetTree,
        tracker: &mut InvalidationTracker,
        position: Point,
        event: &InputEvent,
    ) {
        let target = tree.hit_test(position);

        if target != self.hovered {
            // Leave: back to idle unless the widget still holds a press.
            if let Some(old) = self.hovered {
                if self.pressed != Some(old) {
                    set_interaction(tree, tracker, old, Interaction::Idle);
                }
            }
            // Enter: hovered unless the widget already shows as pressed.
            if let Some(new) = target {
                if self.pressed != Some(new) {
                    set_interaction(tree, tracker, new, Interaction::Hovered);
                }
            }
            self.hovered = target;
        }

        if let Some(target) = target {
            bubble(tree, event, target);
        }
    }

    fn pointer_down(
        &mut self,
        tree: &mut WidgetTree,
        tracker: &mut InvalidationTracker,
        position: Point,
        event: &InputEvent,
    ) {
        let Some(target) = tree.hit_test(position) else {
            return;
        };
        bubble(tree, event, target);
        set_interaction(tree, tracker, target, Interaction::Pressed);
        self.pressed = Some(target);
    }

    fn pointer_up(
        &mut self,
        tree: &mut WidgetTree,
        tracker: &mut InvalidationTracker,
        position: Point,
        event: &InputEvent,
    ) {
        if let Some(target) = tree.hit_test(position) {
            bubble(tree, event, target);
        }

        let Some(pressed) = self.pressed.take() else {
            return;
        };
        let released_inside = tree
            .get(pressed)
            .map(|d| d.visible && d.rect().contains(position))
            .unwrap_or(false);

        let next = if released_inside { Interaction::Hovered } else { Interaction::Idle };
        set_interaction(tree, tracker, pressed, next);

        // A press that was dragged off and released elsewhere is not a click.
        if released_inside {
            fire_click(tree, pressed);
        }
    }

    // ── Keys ─────────────────────────────────────────────────────────

    fn key_event(&mut self, tree: &mut WidgetTree, event: &InputEvent) {
        let target = self.pressed.or(self.hovered).or_else(|| tree.root());
        if let Some(target) = target {
            bubble(tree, event, target);
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Offer the event along the bubble path until a handler consumes it.
/// Returns the consuming widget, if any.
fn bubble(tree: &mut WidgetTree, event: &InputEvent, start: WidgetId) -> Option<WidgetId> {
    for id in tree.bubble_path(start) {
        // Take the handler out so user code runs without a tree borrow.
        let handler = tree.get_mut(id).and_then(|d| d.on_event.take());
        if let Some(mut handler) = handler {
            let result = handler(event);
            if let Some(data) = tree.get_mut(id) {
                data.on_event = Some(handler);
            }
            if result == EventResult::Consumed {
                return Some(id);
            }
        }
    }
    None
}

/// Update a widget's interaction state, marking it for repaint on change.
fn set_interaction(
    tree: &mut WidgetTree,
    tracker: &mut InvalidationTracker,
    id: WidgetId,
    state: Interaction,
) {
    let changed = match tree.get_mut(id) {
        Some(data) => {
            let changed = data.interaction != state;
            data.interaction = state;
            changed
        }
        None => false,
    };
    if changed {
        tracker.mark_paint_dirty(tree, id);
    }
}

/// Invoke a widget's click handler, if present. The handler is taken out
/// for the duration of the call so it may freely mutate reactive cells.
fn fire_click(tree: &mut WidgetTree, id: WidgetId) {
    let handler = tree.get_mut(id).and_then(|d| d.on_click.take());
    if let Some(mut handler) = handler {
        handler();
        if let Some(data) = tree.get_mut(id) {
            data.on_click = Some(handler);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
