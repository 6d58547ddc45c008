//! The paint walk: translate paint-dirty subtrees into surface calls.

use crate::geometry::Rect;
use crate::invalidate::{Invalidate, InvalidationTracker};
use crate::style::ResolvedStyle;
use crate::tree::{Content, WidgetId, WidgetTree};

use super::surface::DrawSurface;

/// Repaint one dirty root: clip to its committed rectangle, draw the
/// subtree back-to-front, clear paint flags along the way.
///
/// Returns the widgets repainted, pre-order. Invisible subtrees are skipped
/// (their flags are still cleared so no dirt lingers on hidden widgets).
pub fn paint_root(
    tree: &WidgetTree,
    tracker: &mut InvalidationTracker,
    surface: &mut dyn DrawSurface,
    root: WidgetId,
) -> Vec<WidgetId> {
    let mut painted = Vec::new();
    let Some(data) = tree.get(root) else {
        return painted;
    };
    surface.clip(data.rect());
    paint_node(tree, tracker, surface, root, &mut painted);
    tracker.settle_ancestors(tree, root, Invalidate::Paint);
    painted
}

fn paint_node(
    tree: &WidgetTree,
    tracker: &mut InvalidationTracker,
    surface: &mut dyn DrawSurface,
    id: WidgetId,
    painted: &mut Vec<WidgetId>,
) {
    let Some(data) = tree.get(id) else { return };

    if !data.visible {
        // Hidden subtrees draw nothing but must not keep dirty bits.
        for widget in tree.walk_depth_first(id) {
            tracker.clear_paint(widget);
        }
        return;
    }

    let rect = data.rect();
    let style = data.resolved_style().cloned().unwrap_or_else(default_style);

    if style.background.is_some() || (style.border_color.is_some() && style.border_width > 0.0) {
        surface.draw_rect(rect, &style);
    }
    if let Content::Text(_) = &data.content {
        if let Some(text) = data.text_content() {
            if !text.is_empty() {
                surface.draw_text(&text, rect.inset(style.padding), &style);
            }
        }
    }

    tracker.clear_paint(id);
    painted.push(id);

    // Children draw over their parent, in order (later siblings on top).
    for &child in tree.children(id) {
        paint_node(tree, tracker, surface, child, painted);
    }
}

fn default_style() -> ResolvedStyle {
    crate::style::resolve(&crate::style::Style::new(), None, &crate::style::Theme::default())
}

/// Convenience wrapper used by tests and embedders that repaint everything.
pub fn paint_all(
    tree: &WidgetTree,
    tracker: &mut InvalidationTracker,
    surface: &mut dyn DrawSurface,
) -> Vec<WidgetId> {
    match tree.root() {
        Some(root) => paint_root(tree, tracker, surface, root),
        None => Vec::new(),
    }
}

/// The union of committed rectangles for a set of widgets — the screen
/// region an embedder must flush after a frame.
pub fn damage_bounds(tree: &WidgetTree, widgets: &[WidgetId]) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    for &id in widgets {
        if let Some(data) = tree.get(id) {
            let rect = data.rect();
            bounds = Some(match bounds {
                Some(b) => b.union(rect),
                None => rect,
            });
        }
    }
    bounds
}

// ===========================================================================
// Tests
// ===========================================================================
