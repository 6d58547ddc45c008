//! Tree operations: insert, attach, detach, destroy, walk, hit-test.

use slotmap::{SecondaryMap, SlotMap};

use crate::geometry::Point;

use super::widget::{WidgetData, WidgetId};

/// Empty slice constant for returning when a widget has no children.
const EMPTY_CHILDREN: &[WidgetId] = &[];

// ---------------------------------------------------------------------------
// TreeError
// ---------------------------------------------------------------------------

/// Malformed tree operations. These are caller bugs, reported rather than
/// silently repaired: in particular attaching a widget that already has a
/// parent never reparents implicitly — detach first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The referenced widget does not exist in this tree.
    #[error("widget is not in the tree")]
    NotInTree,
    /// The widget already has a parent; detach it before attaching.
    #[error("widget already has a parent")]
    AlreadyAttached,
    /// The attachment would make the widget an ancestor of itself.
    #[error("attachment would create a cycle")]
    WouldCycle,
}

// ---------------------------------------------------------------------------
// WidgetTree
// ---------------------------------------------------------------------------

/// The widget arena plus parent/child links.
///
/// All widgets live in a single `SlotMap`; relationships sit in secondary
/// maps so removal is O(subtree) and lookup O(1). A widget owns its children
/// exclusively; the parent link is a plain back-reference used for
/// invalidation bubbling and hit-test ancestry, never for ownership.
pub struct WidgetTree {
    nodes: SlotMap<WidgetId, WidgetData>,
    children: SecondaryMap<WidgetId, Vec<WidgetId>>,
    parent: SecondaryMap<WidgetId, WidgetId>,
    root: Option<WidgetId>,
}

impl WidgetTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            root: None,
        }
    }

    /// Insert a widget in the detached state (no parent, not the root).
    pub fn insert(&mut self, data: WidgetData) -> WidgetId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        id
    }

    /// Insert a widget directly as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `parent` does not exist in the tree.
    pub fn insert_child(&mut self, parent: WidgetId, data: WidgetData) -> WidgetId {
        debug_assert!(self.nodes.contains_key(parent), "parent widget does not exist");
        let id = self.insert(data);
        self.parent.insert(id, parent);
        self.children
            .get_mut(parent)
            .expect("parent must have a children vec")
            .push(id);
        id
    }

    /// Attach a detached widget as the last child of `parent`.
    ///
    /// Fails with [`TreeError::AlreadyAttached`] if the widget already has a
    /// parent and with [`TreeError::WouldCycle`] if `parent` sits inside the
    /// widget's own subtree.
    pub fn attach(&mut self, child: WidgetId, parent: WidgetId) -> Result<(), TreeError> {
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            return Err(TreeError::NotInTree);
        }
        if self.parent.contains_key(child) {
            return Err(TreeError::AlreadyAttached);
        }
        if child == parent || self.ancestors(parent).contains(&child) {
            return Err(TreeError::WouldCycle);
        }
        self.parent.insert(child, parent);
        self.children
            .get_mut(parent)
            .expect("parent must have a children vec")
            .push(child);
        Ok(())
    }

    /// Detach a widget from its parent, keeping its subtree intact.
    ///
    /// Returns the former parent (so the caller can invalidate its layout),
    /// or `None` if the widget had no parent or is not in the tree.
    pub fn detach(&mut self, id: WidgetId) -> Option<WidgetId> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        let former = self.parent.remove(id)?;
        if let Some(siblings) = self.children.get_mut(former) {
            siblings.retain(|&c| c != id);
        }
        Some(former)
    }

    /// Destroy a widget and its whole subtree, depth-first, children before
    /// their parent. Each widget's reactive subscriptions are disposed before
    /// it is removed, so no notification can reach a dead widget.
    ///
    /// Returns the former parent, or `None` for detached/root/unknown ids.
    pub fn destroy(&mut self, id: WidgetId) -> Option<WidgetId> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        let former = self.detach(id);
        if self.root == Some(id) {
            self.root = None;
        }
        self.destroy_recursive(id);
        former
    }

    fn destroy_recursive(&mut self, id: WidgetId) {
        let kids = self.children.remove(id).unwrap_or_default();
        for child in kids {
            self.destroy_recursive(child);
        }
        self.parent.remove(id);
        if let Some(data) = self.nodes.remove(id) {
            for sub in &data.subscriptions {
                sub.dispose();
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The parent of a widget, if it has one.
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.parent.get(id).copied()
    }

    /// The children of a widget, in order. Empty if unknown.
    pub fn children(&self, id: WidgetId) -> &[WidgetId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(EMPTY_CHILDREN)
    }

    /// Ancestors from the immediate parent up to the root (exclusive of `id`).
    pub fn ancestors(&self, id: WidgetId) -> Vec<WidgetId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Immutable access to a widget's data.
    pub fn get(&self, id: WidgetId) -> Option<&WidgetData> {
        self.nodes.get(id)
    }

    /// Mutable access to a widget's data.
    pub fn get_mut(&mut self, id: WidgetId) -> Option<&mut WidgetData> {
        self.nodes.get_mut(id)
    }

    /// The root widget, if set.
    pub fn root(&self) -> Option<WidgetId> {
        self.root
    }

    /// Make a widget the root of the tree. The root has no parent.
    pub fn set_root(&mut self, id: WidgetId) -> Result<(), TreeError> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::NotInTree);
        }
        if self.parent.contains_key(id) {
            return Err(TreeError::AlreadyAttached);
        }
        self.root = Some(id);
        Ok(())
    }

    /// Number of widgets in the tree (attached or detached).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the tree contains the widget.
    pub fn contains(&self, id: WidgetId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: WidgetId) -> Vec<WidgetId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    // ── Hit-testing ──────────────────────────────────────────────────

    /// Find the deepest visible, interactive widget whose committed geometry
    /// contains `point`.
    ///
    /// Later siblings are drawn on top and therefore checked first. A
    /// non-interactive widget is skipped as a target but its children are
    /// still considered; an invisible widget hides its whole subtree.
    pub fn hit_test(&self, point: Point) -> Option<WidgetId> {
        self.root.and_then(|root| self.hit_node(root, point))
    }

    fn hit_node(&self, id: WidgetId, point: Point) -> Option<WidgetId> {
        let data = self.get(id)?;
        if !data.visible || !data.rect.contains(point) {
            return None;
        }
        for &child in self.children(id).iter().rev() {
            if let Some(hit) = self.hit_node(child, point) {
                return Some(hit);
            }
        }
        if data.interactive {
            Some(id)
        } else {
            None
        }
    }

    /// The bubble path from `start` up to the root, inclusive on both ends.
    pub fn bubble_path(&self, start: WidgetId) -> Vec<WidgetId> {
        if !self.contains(start) {
            return Vec::new();
        }
        let mut path = vec![start];
        path.extend(self.ancestors(start));
        path
    }
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
