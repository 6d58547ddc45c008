//! The measure/arrange engine.
//!
//! Measurement is a pure function of (constraint, style, content, children's
//! measured sizes): it never touches committed geometry. Arrangement assigns
//! final rectangles top-down using the sizes cached by the measure pass and
//! clears layout-dirty flags as it commits. Between frames the engine keeps
//! a per-widget measurement cache keyed on the incoming constraint and a
//! content/style fingerprint; a clean widget whose inputs are unchanged is
//! not re-measured.

use slotmap::SecondaryMap;

use crate::geometry::{Rect, Size};
use crate::invalidate::{DirtyFlags, Invalidate, InvalidationTracker};
use crate::render::TextMeasure;
use crate::style::{resolve, ResolvedStyle, Theme};
use crate::tree::{Axis, Content, ContainerContent, CrossAlign, MainAlign, WidgetId, WidgetTree};

use super::constraint::{Constraint, LayoutError};

// ---------------------------------------------------------------------------
// Measurement cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct MeasureEntry {
    constraint: Constraint,
    fingerprint: (u64, u64),
    size: Size,
}

// ---------------------------------------------------------------------------
// LayoutEngine
// ---------------------------------------------------------------------------

/// Runs the two-pass layout protocol over dirty subtrees.
pub struct LayoutEngine {
    cache: SecondaryMap<WidgetId, MeasureEntry>,
}

impl LayoutEngine {
    /// Create an engine with an empty measurement cache.
    pub fn new() -> Self {
        Self { cache: SecondaryMap::new() }
    }

    /// Lay out one dirty root into its assigned rectangle.
    ///
    /// Measures the subtree under a tight constraint first (pure), then
    /// arranges it. A measurement failure aborts before anything is
    /// committed, so the subtree keeps its previous geometry.
    pub fn layout_root(
        &mut self,
        tree: &mut WidgetTree,
        tracker: &mut InvalidationTracker,
        text: &dyn TextMeasure,
        root: WidgetId,
        assigned: Rect,
    ) -> Result<(), LayoutError> {
        let constraint = Constraint::tight(assigned.size());
        self.measure(tree, tracker, text, root, constraint)?;
        self.arrange(tree, tracker, root, assigned);
        tracker.settle_ancestors(tree, root, Invalidate::Layout);
        Ok(())
    }

    /// Drop a widget's cached measurement (widget destroyed).
    pub fn forget(&mut self, id: WidgetId) {
        self.cache.remove(id);
    }

    /// The size the widget last measured to, if any.
    pub fn cached_size(&self, id: WidgetId) -> Option<Size> {
        self.cache.get(id).map(|e| e.size)
    }

    // ── Measure pass ─────────────────────────────────────────────────

    /// Compute a widget's preferred size under `constraint`.
    ///
    /// Pure with respect to the tree: only the engine's cache is written.
    pub fn measure(
        &mut self,
        tree: &WidgetTree,
        tracker: &InvalidationTracker,
        text: &dyn TextMeasure,
        id: WidgetId,
        constraint: Constraint,
    ) -> Result<Size, LayoutError> {
        constraint.validate()?;
        let Some(data) = tree.get(id) else {
            return Ok(Size::ZERO);
        };

        // Cache hit: same constraint, unchanged style/content, no dirt in
        // the subtree. Observably equivalent to recomputing.
        let fingerprint = data.measure_fingerprint();
        let flags = tracker.flags(id);
        let clean = !flags.intersects(DirtyFlags::LAYOUT | DirtyFlags::CHILD_LAYOUT);
        if clean {
            if let Some(entry) = self.cache.get(id) {
                if entry.constraint == constraint && entry.fingerprint == fingerprint {
                    return Ok(entry.size);
                }
            }
        }

        let style = effective_style(tree, id);
        let padding = style.padding;
        let inner = constraint.deflate(padding).loosen();

        let measured = match &data.content {
            Content::Text(t) => {
                let run = t.text.current();
                text.measure(&run, &style) + padding.size()
            }
            Content::Container(c) => {
                self.measure_stack(tree, tracker, text, id, c, inner)? + padding.size()
            }
            Content::Overlay(_) => {
                // Children each get the whole content box; the overlay
                // prefers the per-axis maximum of its children.
                let mut size = Size::ZERO;
                for &child in tree.children(id) {
                    let child_size = self.measure(tree, tracker, text, child, inner)?;
                    size = size.max(child_size);
                }
                size + padding.size()
            }
        };

        let size = apply_style_sizing(measured, &style);
        let size = constraint.clamp(size.sanitize());
        self.cache.insert(id, MeasureEntry { constraint, fingerprint, size });
        Ok(size)
    }

    /// Measure a stacking container's children and combine them: sum along
    /// the main axis (plus spacing between adjacent children), maximum
    /// across the cross axis. Zero children measure to zero; the caller
    /// adds padding.
    fn measure_stack(
        &mut self,
        tree: &WidgetTree,
        tracker: &InvalidationTracker,
        text: &dyn TextMeasure,
        id: WidgetId,
        content: &ContainerContent,
        inner: Constraint,
    ) -> Result<Size, LayoutError> {
        let children = tree.children(id);
        if children.is_empty() {
            return Ok(Size::ZERO);
        }

        // Children get the full cross axis and an unbounded main axis: the
        // container divides main-axis space during arrange.
        let child_constraint = match content.axis {
            Axis::Horizontal => {
                Constraint::new(Size::ZERO, Size::new(f32::INFINITY, inner.max.height))
            }
            Axis::Vertical => {
                Constraint::new(Size::ZERO, Size::new(inner.max.width, f32::INFINITY))
            }
        };

        let mut main_total = 0.0;
        let mut cross_max: f32 = 0.0;
        for &child in children {
            let child_size = self.measure(tree, tracker, text, child, child_constraint)?;
            let (main, cross) = split_axes(child_size, content.axis);
            main_total += main;
            cross_max = cross_max.max(cross);
        }
        main_total += content.spacing * (children.len() - 1) as f32;

        Ok(join_axes(main_total, cross_max, content.axis))
    }

    // ── Arrange pass ─────────────────────────────────────────────────

    /// Commit `rect` as the widget's geometry and lay out its children
    /// inside it. Clears the widget's layout-dirty flag; a widget whose
    /// rectangle actually changed is marked for repaint.
    pub fn arrange(
        &mut self,
        tree: &mut WidgetTree,
        tracker: &mut InvalidationTracker,
        id: WidgetId,
        rect: Rect,
    ) {
        let moved = match tree.get_mut(id) {
            Some(data) => {
                let moved = data.rect != rect;
                data.rect = rect;
                moved
            }
            None => return,
        };
        if moved {
            tracker.mark_paint_dirty(tree, id);
        }

        let style = effective_style(tree, id);
        let content_box = rect.inset(style.padding);

        // Clone the layout policy out so the tree borrow can be released
        // before recursing.
        enum Plan {
            Leaf,
            Stack(ContainerContent, Vec<WidgetId>),
            Overlay(Vec<WidgetId>),
        }
        let plan = match &tree.get(id).expect("widget exists").content {
            Content::Text(_) => Plan::Leaf,
            Content::Container(c) => Plan::Stack(c.clone(), tree.children(id).to_vec()),
            Content::Overlay(_) => Plan::Overlay(tree.children(id).to_vec()),
        };

        match plan {
            Plan::Leaf => {}
            Plan::Stack(content, children) => {
                self.arrange_stack(tree, tracker, &content, &children, content_box);
            }
            Plan::Overlay(children) => {
                for child in children {
                    let size = self.cached_size(child).unwrap_or(Size::ZERO);
                    let child_rect =
                        clamp_into(Rect::from_origin(content_box.origin(), size), content_box);
                    self.arrange(tree, tracker, child, child_rect);
                }
            }
        }

        tracker.clear_layout(id);
    }

    /// Place a stacking container's children using their measured sizes and
    /// the container's alignment policy.
    fn arrange_stack(
        &mut self,
        tree: &mut WidgetTree,
        tracker: &mut InvalidationTracker,
        content: &ContainerContent,
        children: &[WidgetId],
        content_box: Rect,
    ) {
        if children.is_empty() {
            return;
        }
        let axis = content.axis;
        let (box_main, box_cross) = split_axes(content_box.size(), axis);

        let sizes: Vec<Size> = children
            .iter()
            .map(|&c| self.cached_size(c).unwrap_or(Size::ZERO))
            .collect();
        let children_main: f32 = sizes.iter().map(|s| split_axes(*s, axis).0).sum();
        let base_gaps = content.spacing * (children.len() - 1) as f32;
        let leftover = (box_main - children_main - base_gaps).max(0.0);

        // Main-axis placement: start offset plus per-gap padding.
        let (mut main_pos, extra_gap) = match content.main_align {
            MainAlign::Start => (0.0, 0.0),
            MainAlign::Center => (leftover / 2.0, 0.0),
            MainAlign::End => (leftover, 0.0),
            MainAlign::SpaceBetween => {
                // Equal gaps between children, none at the edges.
                if children.len() > 1 {
                    (0.0, leftover / (children.len() - 1) as f32)
                } else {
                    (0.0, 0.0)
                }
            }
        };

        for (&child, &size) in children.iter().zip(&sizes) {
            let (child_main, child_cross) = split_axes(size, axis);

            // Cross-axis placement.
            let (cross_pos, cross_size) = match content.cross_align {
                CrossAlign::Start => (0.0, child_cross),
                CrossAlign::Center => ((box_cross - child_cross) / 2.0, child_cross),
                CrossAlign::End => (box_cross - child_cross, child_cross),
                CrossAlign::Stretch => (0.0, box_cross),
            };

            let child_rect = match axis {
                Axis::Horizontal => Rect::new(
                    content_box.x + main_pos,
                    content_box.y + cross_pos,
                    child_main,
                    cross_size,
                ),
                Axis::Vertical => Rect::new(
                    content_box.x + cross_pos,
                    content_box.y + main_pos,
                    cross_size,
                    child_main,
                ),
            };
            self.arrange(tree, tracker, child, clamp_into(child_rect, content_box));

            main_pos += child_main + content.spacing + extra_gap;
        }
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The widget's cached resolved style, or a default-theme resolution for
/// widgets laid out before any attach-time resolution happened.
fn effective_style(tree: &WidgetTree, id: WidgetId) -> ResolvedStyle {
    match tree.get(id).and_then(|d| d.resolved_style().cloned()) {
        Some(style) => style,
        None => {
            let overrides = tree.get(id).map(|d| d.overrides.clone()).unwrap_or_default();
            resolve(&overrides, None, &Theme::default())
        }
    }
}

/// Apply the style's explicit and min/max sizing on top of a measured size.
fn apply_style_sizing(measured: Size, style: &ResolvedStyle) -> Size {
    let mut size = measured;
    if let Some(w) = style.width {
        size.width = w;
    }
    if let Some(h) = style.height {
        size.height = h;
    }
    if let Some(min) = style.min_width {
        size.width = size.width.max(min);
    }
    if let Some(min) = style.min_height {
        size.height = size.height.max(min);
    }
    if let Some(max) = style.max_width {
        size.width = size.width.min(max);
    }
    if let Some(max) = style.max_height {
        size.height = size.height.min(max);
    }
    size
}

/// (main, cross) extent of a size along the given axis.
fn split_axes(size: Size, axis: Axis) -> (f32, f32) {
    match axis {
        Axis::Horizontal => (size.width, size.height),
        Axis::Vertical => (size.height, size.width),
    }
}

/// Recombine main/cross extents into a size.
fn join_axes(main: f32, cross: f32, axis: Axis) -> Size {
    match axis {
        Axis::Horizontal => Size::new(main, cross),
        Axis::Vertical => Size::new(cross, main),
    }
}

/// Keep a child rectangle inside its parent's content box without moving a
/// zero-sized child off its assigned origin: the position is clamped into
/// the box, the extent trimmed to what remains.
fn clamp_into(child: Rect, bounds: Rect) -> Rect {
    let x = child.x.clamp(bounds.x, bounds.right());
    let y = child.y.clamp(bounds.y, bounds.bottom());
    Rect {
        x,
        y,
        width: child.width.min(bounds.right() - x).max(0.0),
        height: child.height.min(bounds.bottom() - y).max(0.0),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
