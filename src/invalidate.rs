//! Dirty tracking: per-widget flags, ancestor bubbling, dirty-root collection.
//!
//! The tracker decides, after any mutation, the minimal set of widgets that
//! must be re-measured, re-arranged, or repainted before the next frame.
//! Own-dirty bits mark the widget itself; separate descendant bits on the
//! ancestor chain make root collection cheap. Marking is O(depth) amortized:
//! the upward walk stops at the first ancestor that already carries the
//! descendant bit.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use slotmap::SecondaryMap;

use crate::tree::{WidgetId, WidgetTree};

bitflags! {
    /// Per-widget dirty state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DirtyFlags: u8 {
        /// The widget itself needs measure + arrange.
        const LAYOUT = 1 << 0;
        /// The widget itself needs repainting.
        const PAINT = 1 << 1;
        /// Some descendant needs layout.
        const CHILD_LAYOUT = 1 << 2;
        /// Some descendant needs repainting.
        const CHILD_PAINT = 1 << 3;
    }
}

/// What kind of invalidation a reactive callback requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidate {
    Layout,
    Paint,
}

// ---------------------------------------------------------------------------
// InvalidationTracker
// ---------------------------------------------------------------------------

/// Owns every widget's dirty flags, in a side table keyed by widget id.
#[derive(Debug, Default)]
pub struct InvalidationTracker {
    flags: SecondaryMap<WidgetId, DirtyFlags>,
}

impl InvalidationTracker {
    /// Create a tracker with no dirty state.
    pub fn new() -> Self {
        Self { flags: SecondaryMap::new() }
    }

    /// Current flags for a widget (empty if never marked).
    pub fn flags(&self, id: WidgetId) -> DirtyFlags {
        self.flags.get(id).copied().unwrap_or_default()
    }

    /// Whether the widget itself needs layout.
    pub fn is_layout_dirty(&self, id: WidgetId) -> bool {
        self.flags(id).contains(DirtyFlags::LAYOUT)
    }

    /// Whether the widget itself needs repainting.
    pub fn is_paint_dirty(&self, id: WidgetId) -> bool {
        self.flags(id).contains(DirtyFlags::PAINT)
    }

    /// Whether the whole tree is clean. The post-pass invariant: after a
    /// full layout+paint pass with no isolated failures, this holds.
    pub fn is_clean(&self) -> bool {
        self.flags.iter().all(|(_, f)| f.is_empty())
    }

    /// Ids that still carry any dirty bit (diagnostics and tests).
    pub fn residual_dirty(&self) -> Vec<WidgetId> {
        self.flags
            .iter()
            .filter(|(_, f)| !f.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Mark a widget as needing measure + arrange.
    ///
    /// Layout dirtiness implies paint dirtiness of the same widget (a
    /// resized widget must also repaint); the reverse does not hold. Both
    /// descendant bits bubble up the ancestor chain, stopping early at an
    /// ancestor that already covers the subtree.
    pub fn mark_layout_dirty(&mut self, tree: &WidgetTree, id: WidgetId) {
        if !tree.contains(id) {
            return;
        }
        self.set(id, DirtyFlags::LAYOUT | DirtyFlags::PAINT);
        self.bubble(tree, id, DirtyFlags::CHILD_LAYOUT);
        self.bubble(tree, id, DirtyFlags::CHILD_PAINT);
    }

    /// Mark a widget for re-measure/arrange without implying a repaint.
    ///
    /// Used when layout invalidation ripples upward to an ancestor that
    /// must redistribute its children but has not itself changed visually:
    /// anything the arrange pass actually moves gets its own paint mark.
    pub(crate) fn mark_layout_only(&mut self, tree: &WidgetTree, id: WidgetId) {
        if !tree.contains(id) {
            return;
        }
        self.set(id, DirtyFlags::LAYOUT);
        self.bubble(tree, id, DirtyFlags::CHILD_LAYOUT);
    }

    /// Mark a widget as needing repaint only. Never touches layout bits.
    pub fn mark_paint_dirty(&mut self, tree: &WidgetTree, id: WidgetId) {
        if !tree.contains(id) {
            return;
        }
        self.set(id, DirtyFlags::PAINT);
        self.bubble(tree, id, DirtyFlags::CHILD_PAINT);
    }

    /// Mark a whole subtree layout- and paint-dirty (theme swaps, style
    /// changes that re-resolve descendants).
    pub fn mark_subtree_dirty(&mut self, tree: &WidgetTree, id: WidgetId) {
        for widget in tree.walk_depth_first(id) {
            self.set(widget, DirtyFlags::LAYOUT | DirtyFlags::PAINT | DirtyFlags::CHILD_LAYOUT | DirtyFlags::CHILD_PAINT);
        }
        // Leaves carry no descendant bits.
        for widget in tree.walk_depth_first(id) {
            if tree.children(widget).is_empty() {
                self.remove(widget, DirtyFlags::CHILD_LAYOUT | DirtyFlags::CHILD_PAINT);
            }
        }
        self.bubble(tree, id, DirtyFlags::CHILD_LAYOUT);
        self.bubble(tree, id, DirtyFlags::CHILD_PAINT);
    }

    fn set(&mut self, id: WidgetId, bits: DirtyFlags) {
        if let Some(entry) = self.flags.entry(id) {
            *entry.or_insert(DirtyFlags::empty()) |= bits;
        }
    }

    fn remove(&mut self, id: WidgetId, bits: DirtyFlags) {
        if let Some(flags) = self.flags.get_mut(id) {
            flags.remove(bits);
        }
    }

    /// Walk the ancestor chain setting `bit`, stopping at the first ancestor
    /// that already has it (its chain is already marked).
    fn bubble(&mut self, tree: &WidgetTree, id: WidgetId, bit: DirtyFlags) {
        let mut current = id;
        while let Some(parent) = tree.parent(current) {
            if self.flags(parent).contains(bit) {
                break;
            }
            self.set(parent, bit);
            current = parent;
        }
    }

    // ── Root collection ──────────────────────────────────────────────

    /// The minimal, pre-ordered set of topmost layout-dirty widgets.
    ///
    /// A widget carrying only a descendant bit delegates downward; the roots
    /// returned are themselves dirty while their parents are not, so an
    /// ancestor is always processed before any dirty widget beneath it.
    pub fn collect_layout_roots(&self, tree: &WidgetTree) -> Vec<WidgetId> {
        self.collect_roots(tree, DirtyFlags::LAYOUT, DirtyFlags::CHILD_LAYOUT)
    }

    /// The minimal, pre-ordered set of topmost paint-dirty widgets.
    pub fn collect_paint_roots(&self, tree: &WidgetTree) -> Vec<WidgetId> {
        self.collect_roots(tree, DirtyFlags::PAINT, DirtyFlags::CHILD_PAINT)
    }

    fn collect_roots(&self, tree: &WidgetTree, own: DirtyFlags, child: DirtyFlags) -> Vec<WidgetId> {
        let mut roots = Vec::new();
        if let Some(root) = tree.root() {
            self.collect_into(tree, root, own, child, &mut roots);
        }
        roots
    }

    fn collect_into(
        &self,
        tree: &WidgetTree,
        id: WidgetId,
        own: DirtyFlags,
        child: DirtyFlags,
        out: &mut Vec<WidgetId>,
    ) {
        let flags = self.flags(id);
        if flags.contains(own) {
            out.push(id);
            return; // the whole subtree is covered by this root
        }
        if flags.contains(child) {
            for &c in tree.children(id) {
                self.collect_into(tree, c, own, child, out);
            }
        }
    }

    // ── Clearing ─────────────────────────────────────────────────────

    /// Clear a widget's own layout bit (arrange completion).
    pub fn clear_layout(&mut self, id: WidgetId) {
        self.remove(id, DirtyFlags::LAYOUT | DirtyFlags::CHILD_LAYOUT);
    }

    /// Clear a widget's own paint bits (paint completion).
    pub fn clear_paint(&mut self, id: WidgetId) {
        self.remove(id, DirtyFlags::PAINT | DirtyFlags::CHILD_PAINT);
    }

    /// After a root's subtree has been processed, walk its ancestor chain
    /// recomputing descendant bits from the children's actual state. Stops
    /// at the first ancestor that still has a dirty branch elsewhere.
    pub fn settle_ancestors(&mut self, tree: &WidgetTree, id: WidgetId, kind: Invalidate) {
        let (own, child) = match kind {
            Invalidate::Layout => (DirtyFlags::LAYOUT, DirtyFlags::CHILD_LAYOUT),
            Invalidate::Paint => (DirtyFlags::PAINT, DirtyFlags::CHILD_PAINT),
        };
        for ancestor in tree.ancestors(id) {
            let any_dirty = tree
                .children(ancestor)
                .iter()
                .any(|&c| self.flags(c).intersects(own | child));
            if any_dirty {
                break;
            }
            self.remove(ancestor, child);
        }
    }

    /// Drop all state for a widget (destroyed widgets keep no flags).
    pub fn forget(&mut self, id: WidgetId) {
        self.flags.remove(id);
    }
}

// ---------------------------------------------------------------------------
// InvalidationQueue
// ---------------------------------------------------------------------------

/// Hand-off queue between reactive subscription callbacks and the frame
/// loop.
///
/// Callbacks run in the middle of cell notification, where no mutable
/// borrow of the tree or tracker is available; they push invalidation
/// requests here and the frame loop drains them into the tracker before
/// collecting dirty roots. Clonable handle, single-threaded.
#[derive(Debug, Clone, Default)]
pub struct InvalidationQueue {
    inner: Rc<RefCell<Vec<(WidgetId, Invalidate)>>>,
}

impl InvalidationQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an invalidation for `id`.
    pub fn push(&self, id: WidgetId, kind: Invalidate) {
        self.inner.borrow_mut().push((id, kind));
    }

    /// Take all pending requests, oldest first.
    pub fn drain(&self) -> Vec<(WidgetId, Invalidate)> {
        std::mem::take(&mut *self.inner.borrow_mut())
    }

    /// Whether anything is pending.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Drop pending requests for one widget (widget disposal).
    pub fn discard(&self, id: WidgetId) {
        self.inner.borrow_mut().retain(|(w, _)| *w != id);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
