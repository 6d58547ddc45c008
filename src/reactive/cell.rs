//! Cell<T>: reactive value holders and the notification runtime.
//!
//! Cells store values in a thread-local runtime; handles are `Copy` ids. A
//! write that changes the value bumps the cell's generation counter and
//! notifies subscribers in subscription order, synchronously, before the
//! write returns. Writes issued from inside a notification callback are
//! queued and drained after the outer notification finishes, so cascades run
//! as a flat loop instead of growing the call stack.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the reactive graph.
///
/// Both variants are reported synchronously to the caller that triggered
/// them; nothing is deferred or silently swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReactiveError {
    /// Adding the requested dependency edge would make the computed graph
    /// cyclic. The edge is rejected and any edges added in the same call are
    /// rolled back.
    #[error("dependency edge would make the computed graph cyclic")]
    CyclicDependency,
    /// The target cell has been disposed. The operation had no effect.
    #[error("operation on a disposed cell")]
    UseAfterDispose,
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Identifies a cell slot inside the runtime. Slots are never reused, so a
/// stale id can always be recognized as disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub(super) usize);

/// Identifies one subscription. Globally unique within the runtime so that
/// disposing a handle can never remove someone else's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct SubId(usize);

/// A type-erased reference to a cell — plain or computed — usable as a
/// dependency source when building a [`Computed`](super::Computed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source(pub(super) CellId);

// ---------------------------------------------------------------------------
// Runtime internals
// ---------------------------------------------------------------------------

pub(super) enum Subscriber {
    /// External callback. Wrapped in `Option` so it can be taken out while
    /// running (avoids holding a runtime borrow across user code).
    Callback(Option<Box<dyn FnMut()>>),
    /// Forward notifications to a downstream computed cell's subscribers
    /// without recomputing it.
    Forward(CellId),
}

/// Sentinel generation that can never equal a live counter; recorded for a
/// source when the cached value is known not to reflect it yet.
pub(super) const GEN_STALE: u64 = u64::MAX;

pub(super) struct DerivedState {
    /// Recompute closure. Taken out while running.
    pub(super) recompute: Option<Box<dyn FnMut() -> Box<dyn Any>>>,
    /// Type-erased `PartialEq` for the cached value.
    pub(super) value_eq: fn(&dyn Any, &dyn Any) -> bool,
    /// Each source paired with its generation at the last recomputation.
    pub(super) sources: Vec<(CellId, u64)>,
    /// Subscription ids registered on each source, for disposal and rollback.
    pub(super) source_subs: Vec<(CellId, SubId)>,
}

pub(super) struct CellSlot {
    pub(super) alive: bool,
    /// Current value (for computed cells: the cached value). Retained after
    /// disposal so late readers observe the final value instead of panicking.
    pub(super) value: Box<dyn Any>,
    /// Monotonic, bumped on every observed value change.
    pub(super) generation: u64,
    /// Insertion order is notification order.
    pub(super) subscribers: Vec<(SubId, Subscriber)>,
    pub(super) derived: Option<DerivedState>,
}

pub(super) struct Runtime {
    pub(super) cells: Vec<CellSlot>,
    next_sub: usize,
    /// True while the notification loop is draining; re-entrant writes queue
    /// instead of recursing.
    notifying: bool,
    /// Cells whose subscribers still need to be told about a change.
    pending: VecDeque<CellId>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            cells: Vec::new(),
            next_sub: 0,
            notifying: false,
            pending: VecDeque::new(),
        }
    }
}

thread_local! {
    pub(super) static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::new());
}

// ---------------------------------------------------------------------------
// Runtime helpers (shared with computed.rs)
// ---------------------------------------------------------------------------

pub(super) fn alloc_cell(value: Box<dyn Any>, derived: Option<DerivedState>) -> CellId {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let id = CellId(rt.cells.len());
        rt.cells.push(CellSlot {
            alive: true,
            value,
            generation: 0,
            subscribers: Vec::new(),
            derived,
        });
        id
    })
}

pub(super) fn generation_of(id: CellId) -> u64 {
    RUNTIME.with(|rt| rt.borrow().cells.get(id.0).map(|s| s.generation).unwrap_or(0))
}

pub(super) fn is_alive(id: CellId) -> bool {
    RUNTIME.with(|rt| rt.borrow().cells.get(id.0).map(|s| s.alive).unwrap_or(false))
}

/// Register a subscriber on `cell`. Returns `None` if the cell is disposed
/// (the registration is silently skipped; the handle becomes inert).
pub(super) fn subscribe_raw(cell: CellId, sub: Subscriber) -> Option<SubId> {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let sid = SubId(rt.next_sub);
        rt.next_sub += 1;
        let slot = rt.cells.get_mut(cell.0)?;
        if !slot.alive {
            return None;
        }
        slot.subscribers.push((sid, sub));
        Some(sid)
    })
}

/// Remove one subscription. Idempotent: removing an id that is already gone
/// is a no-op.
pub(super) fn unsubscribe_raw(cell: CellId, sub: SubId) {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if let Some(slot) = rt.cells.get_mut(cell.0) {
            slot.subscribers.retain(|(sid, _)| *sid != sub);
        }
    });
}

/// Tear a cell down: block further writes, drop all subscriptions on it,
/// unhook it from its sources, and discard any queued notification for it.
pub(super) fn dispose_cell(id: CellId) {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let source_subs = {
            let Some(slot) = rt.cells.get_mut(id.0) else { return };
            if !slot.alive {
                return;
            }
            slot.alive = false;
            slot.subscribers.clear();
            match slot.derived.as_mut() {
                Some(d) => {
                    d.recompute = None;
                    std::mem::take(&mut d.source_subs)
                }
                None => Vec::new(),
            }
        };
        for (src, sid) in source_subs {
            if let Some(slot) = rt.cells.get_mut(src.0) {
                slot.subscribers.retain(|(existing, _)| *existing != sid);
            }
        }
        // A disposed cell must never fire a pending notification.
        rt.pending.retain(|c| *c != id);
    });
}

/// Whether `from` can reach `target` by walking dependency edges upstream
/// (through computed cells' source lists). Used to reject cycles before an
/// edge is created.
pub(super) fn reaches(from: CellId, target: CellId) -> bool {
    RUNTIME.with(|rt| {
        let rt = rt.borrow();
        if from == target {
            return true;
        }
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(derived) = rt.cells.get(current.0).and_then(|s| s.derived.as_ref()) {
                for (src, _) in &derived.sources {
                    stack.push(*src);
                }
            }
        }
        false
    })
}

/// Queue a notification for `cell` and, unless a notification loop is
/// already running higher up the stack, drain the queue to completion.
pub(super) fn notify(cell: CellId) {
    let outer_running = RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if !rt.pending.contains(&cell) {
            rt.pending.push_back(cell);
        }
        rt.notifying
    });
    if outer_running {
        // Re-entrant write: the outer loop will deliver it.
        return;
    }

    RUNTIME.with(|rt| rt.borrow_mut().notifying = true);
    loop {
        let next = RUNTIME.with(|rt| rt.borrow_mut().pending.pop_front());
        match next {
            Some(id) => deliver(id),
            None => break,
        }
    }
    RUNTIME.with(|rt| rt.borrow_mut().notifying = false);
}

/// Queue a notification without starting a drain loop. Only called from
/// inside `deliver`, where the loop in `notify` is already running.
fn enqueue(cell: CellId) {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if !rt.pending.contains(&cell) {
            rt.pending.push_back(cell);
        }
    });
}

/// Run all of one cell's subscribers, in subscription order.
fn deliver(cell: CellId) {
    // Snapshot ids up front; each is re-resolved before running so that a
    // subscription disposed by an earlier callback in this delivery is
    // skipped rather than fired.
    let sub_ids: Vec<SubId> = RUNTIME.with(|rt| {
        let rt = rt.borrow();
        match rt.cells.get(cell.0) {
            Some(slot) if slot.alive => slot.subscribers.iter().map(|(sid, _)| *sid).collect(),
            _ => Vec::new(),
        }
    });

    enum Action {
        Run(Box<dyn FnMut()>),
        Forward(CellId),
        Skip,
    }

    for sid in sub_ids {
        let action = RUNTIME.with(|rt| {
            let mut rt = rt.borrow_mut();
            let Some(slot) = rt.cells.get_mut(cell.0) else {
                return Action::Skip;
            };
            if !slot.alive {
                return Action::Skip;
            }
            match slot.subscribers.iter_mut().find(|(existing, _)| *existing == sid) {
                Some((_, Subscriber::Callback(cb))) => match cb.take() {
                    Some(f) => Action::Run(f),
                    None => Action::Skip,
                },
                Some((_, Subscriber::Forward(target))) => Action::Forward(*target),
                None => Action::Skip,
            }
        });

        match action {
            Action::Run(mut f) => {
                // User code runs without any runtime borrow held.
                f();
                RUNTIME.with(|rt| {
                    let mut rt = rt.borrow_mut();
                    if let Some(slot) = rt.cells.get_mut(cell.0) {
                        if let Some((_, Subscriber::Callback(cb))) =
                            slot.subscribers.iter_mut().find(|(existing, _)| *existing == sid)
                        {
                            *cb = Some(f);
                        }
                    }
                });
            }
            Action::Forward(target) => enqueue(target),
            Action::Skip => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A mutable reactive value holder. `Copy` — only stores an id.
///
/// Equality policy: a write that compares equal (`PartialEq`) to the current
/// value is a no-op for every cell type — no generation bump, no
/// notification. This is the one consistent policy across the crate; cells
/// of types without a meaningful equality should wrap them in a newtype
/// whose `PartialEq` says otherwise.
pub struct Cell<T: 'static> {
    id: CellId,
    _marker: PhantomData<T>,
}

// Manual impls so we don't require T: Copy/Clone for the handle itself.
impl<T: 'static> Copy for Cell<T> {}
impl<T: 'static> Clone for Cell<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell").field("id", &self.id.0).finish()
    }
}

impl<T: PartialEq + 'static> Cell<T> {
    /// Create a new cell holding `initial`.
    pub fn new(initial: T) -> Self {
        let id = alloc_cell(Box::new(initial), None);
        Self { id, _marker: PhantomData }
    }

    /// Write a new value.
    ///
    /// If the value differs from the current one, the generation counter is
    /// bumped and every subscriber is invoked exactly once, in subscription
    /// order, before this call returns. A write issued from inside a
    /// subscriber callback is queued and delivered after the in-flight
    /// notification completes (still before the outermost write returns).
    pub fn set(&self, value: T) -> Result<(), ReactiveError> {
        let changed = RUNTIME.with(|rt| {
            let mut rt = rt.borrow_mut();
            let slot = rt
                .cells
                .get_mut(self.id.0)
                .filter(|s| s.alive)
                .ok_or(ReactiveError::UseAfterDispose)?;
            let current = slot.value.downcast_ref::<T>().expect("cell type mismatch");
            if *current == value {
                return Ok(false);
            }
            slot.value = Box::new(value);
            slot.generation += 1;
            Ok(true)
        })?;
        if changed {
            notify(self.id);
        }
        Ok(())
    }

    /// Mutate the value in place through a clone-modify-write cycle.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), ReactiveError>
    where
        T: Clone,
    {
        let mut value = self.with(|v| v.clone());
        f(&mut value);
        self.set(value)
    }
}

impl<T: 'static> Cell<T> {
    /// Read the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(|v| v.clone())
    }

    /// Read by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        RUNTIME.with(|rt| {
            let rt = rt.borrow();
            let slot = &rt.cells[self.id.0];
            f(slot.value.downcast_ref::<T>().expect("cell type mismatch"))
        })
    }

    /// Register a change callback. Returns a [`Subscription`] whose
    /// `dispose` removes exactly this registration.
    ///
    /// Subscribing to a disposed cell yields an inert handle.
    pub fn subscribe(&self, callback: impl FnMut() + 'static) -> Subscription {
        let sid = subscribe_raw(self.id, Subscriber::Callback(Some(Box::new(callback))));
        Subscription { cell: self.id, id: sid }
    }

    /// The cell's generation counter: bumped once per observed change.
    pub fn generation(&self) -> u64 {
        generation_of(self.id)
    }

    /// Whether this cell has been disposed.
    pub fn is_disposed(&self) -> bool {
        !is_alive(self.id)
    }

    /// Dispose the cell: later writes fail with
    /// [`ReactiveError::UseAfterDispose`], all subscriptions on it are
    /// dropped, and any queued notification is discarded. Reads keep
    /// returning the final value.
    pub fn dispose(&self) {
        dispose_cell(self.id);
    }

    /// This cell as a dependency source for a computed cell.
    pub fn source(&self) -> Source {
        Source(self.id)
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle for one registered subscriber callback.
///
/// Disposal is explicit (not on drop) so handles can be stored and moved
/// freely; `dispose` is idempotent.
#[derive(Debug)]
pub struct Subscription {
    cell: CellId,
    /// `None` when the subscription was never registered (cell already
    /// disposed at subscribe time).
    id: Option<SubId>,
}

impl Subscription {
    pub(super) fn from_parts(cell: CellId, id: Option<SubId>) -> Self {
        Self { cell, id }
    }

    /// Remove this subscription. Calling it again is a no-op.
    pub fn dispose(&self) {
        if let Some(sid) = self.id {
            unsubscribe_raw(self.cell, sid);
        }
    }
}

// ---------------------------------------------------------------------------
// Test helper: reset the thread-local runtime between tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) fn reset_runtime() {
    RUNTIME.with(|rt| {
        *rt.borrow_mut() = Runtime::new();
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
