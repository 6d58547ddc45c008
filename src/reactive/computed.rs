//! Computed<T>: read-only cells derived from declared sources.
//!
//! A computed cell caches its value together with the generation counter of
//! every source at the time of the last recomputation. Reads are lazy: the
//! cached value is returned unless some source generation has advanced, in
//! which case the derivation runs again (sources first, depth-first). Source
//! notifications are forwarded to the computed cell's own subscribers
//! without recomputing anything.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use super::cell::{
    alloc_cell, dispose_cell, generation_of, is_alive, reaches, subscribe_raw, unsubscribe_raw,
    CellId, DerivedState, ReactiveError, Source, SubId, Subscriber, Subscription, GEN_STALE,
    RUNTIME,
};

/// Type-erased `PartialEq`, monomorphized per computed value type.
fn any_eq<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Computed
// ---------------------------------------------------------------------------

/// A read-only cell whose value is derived from one or more source cells via
/// a pure function. `Copy` — only stores an id.
pub struct Computed<T: 'static> {
    id: CellId,
    _marker: PhantomData<T>,
}

impl<T: 'static> Copy for Computed<T> {}
impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed").field("id", &self.id.0).finish()
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    /// Create a computed cell over the given sources.
    ///
    /// `derive` is evaluated once eagerly to seed the cache (so the cell is
    /// readable immediately), and the current generation of each source is
    /// recorded — the first read after construction recomputes nothing.
    ///
    /// Every dependency edge goes through a reachability check; an edge that
    /// would close a cycle fails with [`ReactiveError::CyclicDependency`]
    /// and rolls back all edges added by this call.
    pub fn new(
        sources: &[Source],
        mut derive: impl FnMut() -> T + 'static,
    ) -> Result<Self, ReactiveError> {
        let initial = derive();
        let derived = DerivedState {
            recompute: Some(Box::new(move || Box::new(derive()) as Box<dyn Any>)),
            value_eq: any_eq::<T>,
            sources: Vec::new(),
            source_subs: Vec::new(),
        };
        let id = alloc_cell(Box::new(initial), Some(derived));
        let computed = Self { id, _marker: PhantomData };
        // The seed value already reflects the sources' current state.
        if let Err(err) = computed.connect_all(sources, true) {
            dispose_cell(id);
            return Err(err);
        }
        Ok(computed)
    }

    /// Add one more dependency edge after construction.
    ///
    /// The cached value is treated as stale with respect to the new source,
    /// so the next read recomputes.
    pub fn add_source(&self, source: Source) -> Result<(), ReactiveError> {
        self.connect_all(std::slice::from_ref(&source), false)
    }

    /// Add several dependency edges; all of them are rolled back if any one
    /// is rejected (no partial registration).
    pub fn add_sources(&self, sources: &[Source]) -> Result<(), ReactiveError> {
        self.connect_all(sources, false)
    }

    fn connect_all(&self, sources: &[Source], seeded: bool) -> Result<(), ReactiveError> {
        let mut added: Vec<(CellId, SubId)> = Vec::new();
        for source in sources {
            match connect(source.0, self.id, seeded) {
                Ok(sid) => added.push((source.0, sid)),
                Err(err) => {
                    for (src, sid) in added {
                        disconnect(src, self.id, sid);
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Read the current value, recomputing first if any source has changed
    /// since the cached value was produced.
    pub fn get(&self) -> T {
        self.with(|v| v.clone())
    }

    /// Read by reference without cloning, resolving staleness first.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        resolve(self.id);
        RUNTIME.with(|rt| {
            let rt = rt.borrow();
            let slot = &rt.cells[self.id.0];
            f(slot.value.downcast_ref::<T>().expect("computed type mismatch"))
        })
    }
}

impl<T: 'static> Computed<T> {
    /// Register a change callback, notified whenever any (transitive) source
    /// changes. The callback itself does not trigger recomputation — the
    /// next read does.
    pub fn subscribe(&self, callback: impl FnMut() + 'static) -> Subscription {
        let sid = subscribe_raw(self.id, Subscriber::Callback(Some(Box::new(callback))));
        Subscription::from_parts(self.id, sid)
    }

    /// The computed cell's own generation: bumped only when a recomputation
    /// produces a value different from the cached one.
    pub fn generation(&self) -> u64 {
        generation_of(self.id)
    }

    /// Whether this computed cell has been disposed.
    pub fn is_disposed(&self) -> bool {
        !is_alive(self.id)
    }

    /// Dispose the cell, unsubscribing it from all of its sources.
    pub fn dispose(&self) {
        dispose_cell(self.id);
    }

    /// This computed cell as a dependency source for another computed cell.
    pub fn source(&self) -> Source {
        Source(self.id)
    }
}

// ---------------------------------------------------------------------------
// Edge management
// ---------------------------------------------------------------------------

/// Create the dependency edge `dependent -> source`, rejecting cycles.
///
/// When `seeded` is true the dependent's cache already reflects the source's
/// current value and its present generation is recorded; otherwise the
/// stale sentinel forces a recomputation on the next read.
fn connect(source: CellId, dependent: CellId, seeded: bool) -> Result<SubId, ReactiveError> {
    if !is_alive(source) || !is_alive(dependent) {
        return Err(ReactiveError::UseAfterDispose);
    }
    if reaches(source, dependent) {
        return Err(ReactiveError::CyclicDependency);
    }
    let sid = subscribe_raw(source, Subscriber::Forward(dependent))
        .ok_or(ReactiveError::UseAfterDispose)?;
    let recorded = if seeded { generation_of(source) } else { GEN_STALE };
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if let Some(derived) = rt.cells.get_mut(dependent.0).and_then(|s| s.derived.as_mut()) {
            derived.sources.push((source, recorded));
            derived.source_subs.push((source, sid));
        }
    });
    Ok(sid)
}

/// Undo one `connect` (rollback path for failed multi-edge registration).
fn disconnect(source: CellId, dependent: CellId, sid: SubId) {
    unsubscribe_raw(source, sid);
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if let Some(derived) = rt.cells.get_mut(dependent.0).and_then(|s| s.derived.as_mut()) {
            derived.sources.retain(|(src, _)| *src != source);
            derived.source_subs.retain(|(_, existing)| *existing != sid);
        }
    });
}

// ---------------------------------------------------------------------------
// Staleness resolution
// ---------------------------------------------------------------------------

/// Bring a computed cell up to date: resolve its sources depth-first, then
/// recompute if any recorded source generation is out of date. A
/// recomputation that produces an equal value leaves the cell's own
/// generation untouched, so dependents stay cached too.
fn resolve(id: CellId) {
    let Some(sources) = RUNTIME.with(|rt| {
        rt.borrow()
            .cells
            .get(id.0)
            .and_then(|s| s.derived.as_ref())
            .map(|d| d.sources.clone())
    }) else {
        return; // plain cell or unknown id: nothing to resolve
    };

    // Sources before dependents. The graph is acyclic by construction, so
    // the recursion terminates.
    for (source, _) in &sources {
        resolve(*source);
    }

    let stale = RUNTIME.with(|rt| {
        let rt = rt.borrow();
        sources.iter().any(|(source, recorded)| {
            let current = rt.cells.get(source.0).map(|s| s.generation).unwrap_or(*recorded);
            current != *recorded
        })
    });
    if !stale {
        return;
    }

    // Take the derivation out so user code runs without a runtime borrow.
    let Some(mut derive) = RUNTIME.with(|rt| {
        rt.borrow_mut()
            .cells
            .get_mut(id.0)
            .and_then(|s| s.derived.as_mut())
            .and_then(|d| d.recompute.take())
    }) else {
        return; // disposed, or already recomputing higher up the stack
    };

    let new_value = derive();

    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let current_gens: Vec<u64> = sources
            .iter()
            .map(|(source, recorded)| {
                rt.cells.get(source.0).map(|s| s.generation).unwrap_or(*recorded)
            })
            .collect();
        let Some(slot) = rt.cells.get_mut(id.0) else { return };
        let Some(eq) = slot.derived.as_ref().map(|d| d.value_eq) else { return };
        let changed = !eq(slot.value.as_ref(), new_value.as_ref());
        if changed {
            slot.value = new_value;
            slot.generation += 1;
        }
        if let Some(derived) = slot.derived.as_mut() {
            for ((_, recorded), current) in derived.sources.iter_mut().zip(current_gens) {
                *recorded = current;
            }
            derived.recompute = Some(derive);
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::cell::reset_runtime;
    use super::*;
    use crate::reactive::Cell;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() {
        reset_runtime();
    }

    /// A derivation wrapped with a call counter.
    fn counted<T: Clone + PartialEq + 'static>(
        count: &Rc<std::cell::Cell<u32>>,
        f: impl Fn() -> T + 'static,
    ) -> impl FnMut() -> T + 'static {
        let count = count.clone();
        move || {
            count.set(count.get() + 1);
            f()
        }
    }

    #[test]
    fn basic_derivation() {
        setup();
        let a = Cell::new(3);
        let doubled = Computed::new(&[a.source()], move || a.get() * 2).unwrap();
        assert_eq!(doubled.get(), 6);
        a.set(5).unwrap();
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn read_is_lazy_zero_recomputation_when_clean() {
        setup();
        let a = Cell::new(3);
        let calls = Rc::new(std::cell::Cell::new(0));
        let doubled = Computed::new(&[a.source()], counted(&calls, move || a.get() * 2)).unwrap();
        assert_eq!(calls.get(), 1); // seed evaluation only

        assert_eq!(doubled.get(), 6);
        assert_eq!(calls.get(), 1); // seeded: first read recomputes nothing

        assert_eq!(doubled.get(), 6);
        assert_eq!(calls.get(), 1); // second clean read: zero derivation calls
    }

    #[test]
    fn source_change_recomputes_once_on_next_read() {
        setup();
        let a = Cell::new(1);
        let calls = Rc::new(std::cell::Cell::new(0));
        let c = Computed::new(&[a.source()], counted(&calls, move || a.get() + 1)).unwrap();

        a.set(2).unwrap();
        a.set(3).unwrap();
        assert_eq!(calls.get(), 1); // no eager recomputation on notification

        assert_eq!(c.get(), 4);
        assert_eq!(calls.get(), 2); // one recomputation covers both writes

        assert_eq!(c.get(), 4);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn chain_resolves_depth_first() {
        setup();
        let a = Cell::new(1);
        let doubled = Computed::new(&[a.source()], move || a.get() * 2).unwrap();
        let quadrupled = Computed::new(&[doubled.source()], move || doubled.get() * 2).unwrap();

        assert_eq!(quadrupled.get(), 4);
        a.set(3).unwrap();
        assert_eq!(quadrupled.get(), 12);
        assert_eq!(doubled.get(), 6);
    }

    #[test]
    fn unchanged_recomputation_does_not_ripple() {
        setup();
        let a = Cell::new(3);
        // Clamped output: changes of a above the cap leave the value equal.
        let clamped = Computed::new(&[a.source()], move || a.get().min(10)).unwrap();
        let calls = Rc::new(std::cell::Cell::new(0));
        let downstream =
            Computed::new(&[clamped.source()], counted(&calls, move || clamped.get() + 1)).unwrap();
        assert_eq!(downstream.get(), 4);
        let baseline = calls.get();

        a.set(15).unwrap();
        assert_eq!(downstream.get(), 11);
        let after_change = calls.get();
        assert_eq!(after_change, baseline + 1);

        // 20 clamps to 10 as well: clamped recomputes but its value (and
        // generation) are unchanged, so downstream stays cached.
        a.set(20).unwrap();
        assert_eq!(downstream.get(), 11);
        assert_eq!(calls.get(), after_change);
    }

    #[test]
    fn generation_tracks_value_changes_only() {
        setup();
        let a = Cell::new(1);
        let clamped = Computed::new(&[a.source()], move || a.get().min(5)).unwrap();
        assert_eq!(clamped.get(), 1);
        let g0 = clamped.generation();

        a.set(3).unwrap();
        assert_eq!(clamped.get(), 3);
        assert_eq!(clamped.generation(), g0 + 1);

        a.set(7).unwrap();
        assert_eq!(clamped.get(), 5);
        let g1 = clamped.generation();

        a.set(9).unwrap();
        assert_eq!(clamped.get(), 5); // recomputed, equal value
        assert_eq!(clamped.generation(), g1);
    }

    #[test]
    fn multiple_sources() {
        setup();
        let a = Cell::new(1);
        let b = Cell::new(10);
        let sum = Computed::new(&[a.source(), b.source()], move || a.get() + b.get()).unwrap();
        assert_eq!(sum.get(), 11);
        a.set(2).unwrap();
        assert_eq!(sum.get(), 12);
        b.set(20).unwrap();
        assert_eq!(sum.get(), 22);
    }

    #[test]
    fn subscriber_notified_on_source_write_without_recompute() {
        setup();
        let a = Cell::new(0);
        let calls = Rc::new(std::cell::Cell::new(0));
        let c = Computed::new(&[a.source()], counted(&calls, move || a.get() * 2)).unwrap();

        let notified = Rc::new(std::cell::Cell::new(0));
        let notified_c = notified.clone();
        let _sub = c.subscribe(move || notified_c.set(notified_c.get() + 1));

        a.set(1).unwrap();
        assert_eq!(notified.get(), 1);
        assert_eq!(calls.get(), 1); // notification alone never recomputes
    }

    #[test]
    fn chain_forwards_notifications_to_the_end() {
        setup();
        let a = Cell::new(0);
        let c1 = Computed::new(&[a.source()], move || a.get() + 1).unwrap();
        let c2 = Computed::new(&[c1.source()], move || c1.get() + 1).unwrap();

        let notified = Rc::new(std::cell::Cell::new(0));
        let notified_c = notified.clone();
        let _sub = c2.subscribe(move || notified_c.set(notified_c.get() + 1));

        a.set(5).unwrap();
        assert_eq!(notified.get(), 1);
        assert_eq!(c2.get(), 7);
    }

    #[test]
    fn diamond_notifies_subscriber_once_per_write() {
        setup();
        let a = Cell::new(0);
        let left = Computed::new(&[a.source()], move || a.get() + 1).unwrap();
        let right = Computed::new(&[a.source()], move || a.get() * 2).unwrap();
        let join = Computed::new(&[left.source(), right.source()], move || {
            left.get() + right.get()
        })
        .unwrap();

        let notified = Rc::new(std::cell::Cell::new(0));
        let notified_c = notified.clone();
        let _sub = join.subscribe(move || notified_c.set(notified_c.get() + 1));

        a.set(3).unwrap();
        assert_eq!(notified.get(), 1);
        assert_eq!(join.get(), 10); // (3+1) + (3*2)
    }

    #[test]
    fn self_edge_rejected() {
        setup();
        let a = Cell::new(0);
        let c = Computed::new(&[a.source()], move || a.get()).unwrap();
        assert_eq!(c.add_source(c.source()), Err(ReactiveError::CyclicDependency));
    }

    #[test]
    fn cycle_through_chain_rejected() {
        setup();
        let a = Cell::new(0);
        let c1 = Computed::new(&[a.source()], move || a.get()).unwrap();
        let c2 = Computed::new(&[c1.source()], move || c1.get()).unwrap();
        let c3 = Computed::new(&[c2.source()], move || c2.get()).unwrap();

        // c3 depends on c2 depends on c1; c1 -> c3 would close the loop.
        assert_eq!(c1.add_source(c3.source()), Err(ReactiveError::CyclicDependency));

        // The graph still works normally afterwards.
        a.set(9).unwrap();
        assert_eq!(c3.get(), 9);
    }

    #[test]
    fn failed_multi_edge_leaves_no_partial_registration() {
        setup();
        let a = Cell::new(0);
        let extra = Cell::new(0);
        let c1 = Computed::new(&[a.source()], move || a.get()).unwrap();
        let c2 = Computed::new(&[c1.source()], move || c1.get()).unwrap();

        // The first edge (extra) is valid, the second (c2) closes a cycle:
        // everything must be rolled back.
        assert_eq!(
            c1.add_sources(&[extra.source(), c2.source()]),
            Err(ReactiveError::CyclicDependency)
        );

        // No dangling subscription: a write to `extra` must not reach c1's
        // subscribers through a half-registered edge.
        let notified = Rc::new(std::cell::Cell::new(0));
        let notified_c = notified.clone();
        let _sub = c1.subscribe(move || notified_c.set(notified_c.get() + 1));
        extra.set(1).unwrap();
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn added_source_forces_recompute_on_next_read() {
        setup();
        let a = Cell::new(1);
        let b = Cell::new(100);
        let calls = Rc::new(std::cell::Cell::new(0));
        let c = Computed::new(
            &[a.source()],
            counted(&calls, move || a.get() + b.get()),
        )
        .unwrap();
        assert_eq!(c.get(), 101);
        let before = calls.get();

        c.add_source(b.source()).unwrap();
        assert_eq!(c.get(), 101);
        assert_eq!(calls.get(), before + 1); // stale sentinel forced one recompute

        b.set(200).unwrap();
        assert_eq!(c.get(), 201);
    }

    #[test]
    fn dispose_unhooks_from_sources() {
        setup();
        let a = Cell::new(0);
        let c = Computed::new(&[a.source()], move || a.get()).unwrap();
        let notified = Rc::new(std::cell::Cell::new(0));
        let notified_c = notified.clone();
        let _sub = c.subscribe(move || notified_c.set(notified_c.get() + 1));

        c.dispose();
        assert!(c.is_disposed());
        a.set(1).unwrap(); // must not panic or notify through the dead cell
        assert_eq!(notified.get(), 0);
        assert_eq!(c.get(), 0); // final cached value remains readable
    }

    #[test]
    fn construction_failure_disposes_the_half_built_cell() {
        setup();
        let a = Cell::new(0);
        let disposed = Cell::new(0);
        disposed.dispose();
        let result = Computed::new(&[a.source(), disposed.source()], move || a.get());
        assert_eq!(result.err(), Some(ReactiveError::UseAfterDispose));

        // The failed attempt must not have left a live edge on `a`.
        let notified = Rc::new(std::cell::Cell::new(0));
        let notified_c = notified.clone();
        let _sub = a.subscribe(move || notified_c.set(notified_c.get() + 1));
        a.set(1).unwrap();
        assert_eq!(notified.get(), 1);
    }

    #[test]
    fn handles_are_copy() {
        setup();
        let a = Cell::new(2);
        let c = Computed::new(&[a.source()], move || a.get() * 3).unwrap();
        let copy = c;
        assert_eq!(copy.get(), 6);
        assert_eq!(c.get(), 6);
    }

    #[test]
    fn debug_format() {
        setup();
        let a = Cell::new(0);
        let c = Computed::new(&[a.source()], move || a.get()).unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("Computed"));
    }

    #[test]
    fn string_computed() {
        setup();
        let name = Cell::new(String::from("world"));
        let greeting =
            Computed::new(&[name.source()], move || format!("hello {}", name.get())).unwrap();
        assert_eq!(greeting.get(), "hello world");
        name.set(String::from("quill")).unwrap();
        assert_eq!(greeting.get(), "hello quill");
    }

    #[test]
    fn subscriber_reading_inside_callback_sees_new_value() {
        setup();
        let log: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let a = Cell::new(1);
        let c = Computed::new(&[a.source()], move || a.get()).unwrap();
        let log_c = log.clone();
        let _sub = c.subscribe(move || log_c.borrow_mut().push(c.get()));
        a.set(2).unwrap();
        assert_eq!(*log.borrow(), vec![2]);
    }
}
