//! App: the frame-loop shell around the core.
//!
//! Owns the widget tree, invalidation tracker, layout engine, and event
//! dispatcher, and exposes the embedder-facing surface: `attach_root`,
//! `run_frame`, `dispose`, `set_theme`. Everything runs on one logical
//! thread; external producers hand events into `run_frame` and reactive
//! callbacks hand invalidations into the queue rather than mutating state
//! directly.

use std::collections::HashSet;

use tracing::warn;

use crate::event::{Dispatcher, InputEvent};
use crate::geometry::{Rect, Size};
use crate::invalidate::{Invalidate, InvalidationQueue, InvalidationTracker};
use crate::layout::LayoutEngine;
use crate::reactive::Cell;
use crate::render::{paint_root, DrawSurface, TextMeasure};
use crate::style::{resolve, Style, Theme};
use crate::tree::{Content, TextValue, TreeError, WidgetData, WidgetId, WidgetTree};

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// The core's application shell.
pub struct App {
    tree: WidgetTree,
    tracker: InvalidationTracker,
    engine: LayoutEngine,
    dispatcher: Dispatcher,
    queue: InvalidationQueue,
    theme: Theme,
    text: Box<dyn TextMeasure>,
}

impl App {
    /// Create an app with the given theme and text-measurement capability.
    pub fn new(theme: Theme, text: Box<dyn TextMeasure>) -> Self {
        Self {
            tree: WidgetTree::new(),
            tracker: InvalidationTracker::new(),
            engine: LayoutEngine::new(),
            dispatcher: Dispatcher::new(),
            queue: InvalidationQueue::new(),
            theme,
            text,
        }
    }

    /// The widget tree (read access).
    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    /// The invalidation tracker (read access, mostly for tests and tools).
    pub fn tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    /// The active theme.
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// A handle to the invalidation queue, for wiring custom subscriptions.
    pub fn invalidations(&self) -> InvalidationQueue {
        self.queue.clone()
    }

    // ── Tree construction ────────────────────────────────────────────

    /// Insert `data` as the root widget: resolves its style against the
    /// theme and marks it for layout.
    pub fn attach_root(&mut self, data: WidgetData) -> WidgetId {
        let id = self.tree.insert(data);
        self.tree.set_root(id).expect("freshly inserted widget is detached");
        self.resolve_subtree(id);
        self.tracker.mark_layout_dirty(&self.tree, id);
        id
    }

    /// Insert a widget in the detached state. It joins the live tree later
    /// via [`attach`](Self::attach).
    pub fn insert(&mut self, data: WidgetData) -> WidgetId {
        self.tree.insert(data)
    }

    /// Insert `data` as the last child of `parent`. Styles resolve with
    /// inheritance from the parent; the parent's layout is invalidated.
    pub fn insert_child(&mut self, parent: WidgetId, data: WidgetData) -> WidgetId {
        let id = self.tree.insert_child(parent, data);
        self.resolve_subtree(id);
        self.invalidate_content_layout(parent);
        id
    }

    /// Attach a detached widget under `parent`. Fails (without reparenting)
    /// if the widget already has a parent.
    pub fn attach(&mut self, child: WidgetId, parent: WidgetId) -> Result<(), TreeError> {
        self.tree.attach(child, parent)?;
        self.resolve_subtree(child);
        self.invalidate_content_layout(parent);
        Ok(())
    }

    /// Detach a widget from its parent, keeping the subtree alive. The
    /// former parent's layout is invalidated.
    pub fn detach(&mut self, id: WidgetId) {
        if let Some(former) = self.tree.detach(id) {
            self.invalidate_content_layout(former);
        }
    }

    /// Destroy a widget and its subtree. Subscriptions are disposed
    /// synchronously, pending invalidations for the subtree are discarded,
    /// and the former parent's layout is invalidated.
    pub fn dispose(&mut self, id: WidgetId) {
        let subtree = self.tree.walk_depth_first(id);
        let former = self.tree.destroy(id);
        for widget in subtree {
            self.tracker.forget(widget);
            self.engine.forget(widget);
            self.dispatcher.forget(widget);
            self.queue.discard(widget);
        }
        if let Some(former) = former {
            self.invalidate_content_layout(former);
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Replace a text widget's content, invalidating its layout.
    pub fn set_text(&mut self, id: WidgetId, text: impl Into<String>) {
        if let Some(data) = self.tree.get_mut(id) {
            data.set_text(text);
            self.invalidate_content_layout(id);
        }
    }

    /// Replace a widget's style overrides. Inherited properties ripple to
    /// descendants, so the whole subtree re-resolves and re-lays-out; the
    /// possible size change ripples to the ancestors.
    pub fn set_style(&mut self, id: WidgetId, style: Style) {
        if let Some(data) = self.tree.get_mut(id) {
            data.set_style(style);
            self.resolve_subtree(id);
            self.tracker.mark_subtree_dirty(&self.tree, id);
            self.invalidate_content_layout(id);
        }
    }

    /// Show or hide a widget. Hidden widgets keep their layout slot but
    /// draw nothing and cannot be hit.
    pub fn set_visible(&mut self, id: WidgetId, visible: bool) {
        let changed = match self.tree.get_mut(id) {
            Some(data) => {
                let changed = data.visible != visible;
                data.visible = visible;
                changed
            }
            None => false,
        };
        if changed {
            self.tracker.mark_paint_dirty(&self.tree, id);
        }
    }

    /// Bind a text widget's content to a reactive cell: the widget re-lays
    /// out whenever the cell changes, via the invalidation queue. The
    /// subscription lives exactly as long as the widget.
    pub fn bind_text(&mut self, id: WidgetId, cell: Cell<String>) {
        let bound = match self.tree.get_mut(id) {
            Some(data) => match &mut data.content {
                Content::Text(t) => {
                    t.text = TextValue::Bound(cell);
                    data.revision += 1;
                    true
                }
                _ => false,
            },
            None => false,
        };
        if !bound {
            return;
        }
        let queue = self.queue.clone();
        let sub = cell.subscribe(move || queue.push(id, Invalidate::Layout));
        if let Some(data) = self.tree.get_mut(id) {
            data.own_subscription(sub);
        }
        self.invalidate_content_layout(id);
    }

    /// Subscribe a widget's invalidation to an arbitrary cell: any change
    /// to the cell marks the widget layout- or paint-dirty next frame.
    pub fn bind_invalidation<T: 'static>(
        &mut self,
        id: WidgetId,
        cell: &Cell<T>,
        kind: Invalidate,
    ) {
        if !self.tree.contains(id) {
            return;
        }
        let queue = self.queue.clone();
        let sub = cell.subscribe(move || queue.push(id, kind));
        if let Some(data) = self.tree.get_mut(id) {
            data.own_subscription(sub);
        }
    }

    /// Swap the active theme: the whole tree re-resolves and re-lays-out.
    /// This is the only way the theme changes after construction.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Some(root) = self.tree.root() {
            self.resolve_subtree(root);
            self.tracker.mark_subtree_dirty(&self.tree, root);
        }
    }

    // ── Frame loop ───────────────────────────────────────────────────

    /// Run one frame: dispatch `events`, drain invalidations, lay out dirty
    /// roots inside `viewport`, repaint paint-dirty subtrees through
    /// `surface`, present. Returns the widgets repainted this frame.
    ///
    /// A layout failure in one dirty root is logged and that subtree skips
    /// both layout and paint for the frame, keeping its previous geometry
    /// and pixels; other subtrees are unaffected.
    pub fn run_frame(
        &mut self,
        events: &[InputEvent],
        viewport: Size,
        surface: &mut dyn DrawSurface,
    ) -> Vec<WidgetId> {
        // (1) Input: may write cells, whose callbacks enqueue invalidations.
        for event in events {
            self.dispatcher.dispatch(&mut self.tree, &mut self.tracker, event);
        }

        // (2) Invalidations accumulated by reactive callbacks.
        self.drain_invalidations();

        // A viewport change re-lays-out from the root.
        if let Some(root) = self.tree.root() {
            let current = self.tree.get(root).map(|d| d.rect().size()).unwrap_or(Size::ZERO);
            if current != viewport {
                self.tracker.mark_layout_dirty(&self.tree, root);
            }
        }

        // (3) Layout over dirty roots, isolated per subtree.
        let mut failed: HashSet<WidgetId> = HashSet::new();
        for root in self.tracker.collect_layout_roots(&self.tree) {
            let assigned = if Some(root) == self.tree.root() {
                viewport.to_rect()
            } else {
                self.tree.get(root).map(|d| d.rect()).unwrap_or(Rect::ZERO)
            };
            if let Err(err) =
                self.engine
                    .layout_root(&mut self.tree, &mut self.tracker, self.text.as_ref(), root, assigned)
            {
                warn!(?root, %err, "layout failed; subtree keeps previous geometry this frame");
                failed.insert(root);
            }
        }

        // (4) Paint walk over paint-dirty roots, skipping failed subtrees.
        let mut painted = Vec::new();
        for root in self.tracker.collect_paint_roots(&self.tree) {
            let in_failed_subtree = failed.contains(&root)
                || self.tree.ancestors(root).iter().any(|a| failed.contains(a));
            if in_failed_subtree {
                continue;
            }
            painted.extend(paint_root(&self.tree, &mut self.tracker, surface, root));
        }

        // (5) Present anything that was drawn.
        if !painted.is_empty() {
            surface.present();
        }
        painted
    }

    fn drain_invalidations(&mut self) {
        for (id, kind) in self.queue.drain() {
            if !self.tree.contains(id) {
                continue;
            }
            match kind {
                Invalidate::Layout => self.invalidate_content_layout(id),
                Invalidate::Paint => self.tracker.mark_paint_dirty(&self.tree, id),
            }
        }
    }

    /// Invalidate a widget's layout and ripple the potential size change up
    /// the ancestor chain. The ripple stops at the first ancestor whose size
    /// cannot depend on its content (explicit width and height), or at the
    /// tree root; that boundary becomes the dirty root and redistributes
    /// its subtree within its own box. The boundary itself is marked
    /// layout-only: whatever the arrange pass actually moves will pick up
    /// its own paint mark.
    fn invalidate_content_layout(&mut self, id: WidgetId) {
        self.tracker.mark_layout_dirty(&self.tree, id);
        let mut boundary = id;
        let mut current = id;
        while let Some(parent) = self.tree.parent(current) {
            boundary = parent;
            let fixed_size = self
                .tree
                .get(parent)
                .map(|d| d.overrides.width.is_some() && d.overrides.height.is_some())
                .unwrap_or(false);
            if fixed_size {
                break;
            }
            current = parent;
        }
        if boundary != id {
            self.tracker.mark_layout_only(&self.tree, boundary);
        }
    }

    /// Resolve styles for a subtree, parents before children so inherited
    /// properties flow down.
    fn resolve_subtree(&mut self, id: WidgetId) {
        for widget in self.tree.walk_depth_first(id) {
            let inherited = self
                .tree
                .parent(widget)
                .and_then(|p| self.tree.get(p))
                .and_then(|d| d.resolved_style().cloned());
            let overrides = self.tree.get(widget).map(|d| d.overrides.clone()).unwrap_or_default();
            let resolved = resolve(&overrides, inherited.as_ref(), &self.theme);
            if let Some(data) = self.tree.get_mut(widget) {
                data.resolved = Some(resolved);
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
