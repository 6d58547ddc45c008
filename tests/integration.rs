//! Integration tests for quill-ui.
//!
//! These exercise the public API from outside the crate: the reactive graph,
//! layout protocol, invalidation closure, and event dispatch working
//! together through the headless harness.

use pretty_assertions::assert_eq;

use quill_ui::geometry::{Edges, Point, Rect, Size};
use quill_ui::invalidate::Invalidate;
use quill_ui::reactive::{Cell, Computed, ReactiveError};
use quill_ui::style::{Color, Style, Theme};
use quill_ui::testing::{DrawOp, Harness};
use quill_ui::tree::{CrossAlign, MainAlign, WidgetData};

use std::cell::{Cell as StdCell, RefCell};
use std::rc::Rc;

const VIEWPORT: Size = Size { width: 200.0, height: 100.0 };

fn harness() -> Harness {
    Harness::new(VIEWPORT)
}

// ---------------------------------------------------------------------------
// Layout determinism
// ---------------------------------------------------------------------------

#[test]
fn layout_is_deterministic_across_frames() {
    let mut h = harness();
    let root = h.app.attach_root(WidgetData::column().with_spacing(4.0));
    let a = h.app.insert_child(root, WidgetData::text("alpha"));
    let b = h.app.insert_child(root, WidgetData::text("beta"));
    h.frame();
    let (ra, rb) = (h.rect_of(a), h.rect_of(b));

    // Re-dirty everything without changing any input.
    h.app.set_theme(Theme::light());
    h.frame();
    assert_eq!(h.rect_of(a), ra);
    assert_eq!(h.rect_of(b), rb);
}

// ---------------------------------------------------------------------------
// Dirty-bit closure
// ---------------------------------------------------------------------------

#[test]
fn dirty_bits_are_empty_after_any_mutation_sequence_and_one_frame() {
    let mut h = harness();
    let root = h.app.attach_root(WidgetData::column());
    let a = h.app.insert_child(root, WidgetData::text("a"));
    let row = h.app.insert_child(root, WidgetData::row());
    let b = h.app.insert_child(row, WidgetData::text("b"));
    h.frame();

    h.app.set_text(a, "changed");
    h.app.set_style(b, Style::new().with_background(Color::WHITE));
    h.app.set_visible(row, false);
    h.app.set_visible(row, true);
    let c = h.app.insert_child(row, WidgetData::text("c"));
    h.app.dispose(c);
    h.frame();

    assert!(
        h.app.tracker().is_clean(),
        "residual dirty bits: {:?}",
        h.app.tracker().residual_dirty()
    );
}

// ---------------------------------------------------------------------------
// Alignment policies
// ---------------------------------------------------------------------------

#[test]
fn stretch_child_fills_container_exactly() {
    let mut h = harness();
    let root = h
        .app
        .attach_root(WidgetData::column().with_cross_align(CrossAlign::Stretch));
    let child = h.app.insert_child(
        root,
        WidgetData::column().with_style(Style::new().with_height(100.0)),
    );
    h.frame();
    // Zero padding: the child gets exactly the container's box.
    assert_eq!(h.rect_of(child), Rect::new(0.0, 0.0, 200.0, 100.0));
}

#[test]
fn space_between_produces_equal_gaps_and_no_edge_gaps() {
    let mut h = Harness::new(Size::new(100.0, 20.0));
    let root = h
        .app
        .attach_root(WidgetData::row().with_main_align(MainAlign::SpaceBetween));
    let zero = Style::new().with_size(0.0, 0.0);
    let a = h.app.insert_child(root, WidgetData::text("").with_style(zero.clone()));
    let b = h.app.insert_child(root, WidgetData::text("").with_style(zero.clone()));
    let c = h.app.insert_child(root, WidgetData::text("").with_style(zero));
    h.frame();

    assert_eq!(h.rect_of(a).x, 0.0);
    assert_eq!(h.rect_of(b).x, 50.0);
    assert_eq!(h.rect_of(c).x, 100.0);
}

#[test]
fn nested_containers_compose() {
    let mut h = harness();
    let root = h.app.attach_root(
        WidgetData::column().with_style(Style::new().with_padding(Edges::all(10.0))),
    );
    let row = h.app.insert_child(root, WidgetData::row().with_spacing(2.0));
    let left = h.app.insert_child(row, WidgetData::text("ab")); // 16 wide
    let right = h.app.insert_child(row, WidgetData::text("c")); // 8 wide
    h.frame();

    assert_eq!(h.rect_of(row).origin(), Point::new(10.0, 10.0));
    assert_eq!(h.rect_of(left).x, 10.0);
    assert_eq!(h.rect_of(right).x, 10.0 + 16.0 + 2.0);
}

// ---------------------------------------------------------------------------
// Click semantics
// ---------------------------------------------------------------------------

/// A 200x100 root with a clickable label in the top-left corner.
fn clickable(clicks: &Rc<StdCell<u32>>) -> (Harness, Rect) {
    let mut h = harness();
    let root = h.app.attach_root(WidgetData::column());
    let clicks_c = clicks.clone();
    let button = h.app.insert_child(
        root,
        WidgetData::text("press me").on_click(move || clicks_c.set(clicks_c.get() + 1)),
    );
    h.frame();
    let rect = h.rect_of(button);
    (h, rect)
}

#[test]
fn press_and_release_inside_clicks_exactly_once() {
    let clicks = Rc::new(StdCell::new(0));
    let (mut h, rect) = clickable(&clicks);

    h.pointer_down(rect.x + 1.0, rect.y + 1.0);
    h.pointer_up(rect.x + 1.0, rect.y + 1.0);
    h.frame();
    assert_eq!(clicks.get(), 1);
}

#[test]
fn press_drag_off_release_does_not_click() {
    let clicks = Rc::new(StdCell::new(0));
    let (mut h, rect) = clickable(&clicks);

    h.pointer_down(rect.x + 1.0, rect.y + 1.0);
    h.pointer_move(rect.right() + 50.0, rect.bottom() + 50.0);
    h.pointer_up(rect.right() + 50.0, rect.bottom() + 50.0);
    h.frame();
    assert_eq!(clicks.get(), 0);
}

#[test]
fn interaction_changes_repaint_the_widget() {
    let clicks = Rc::new(StdCell::new(0));
    let (mut h, rect) = clickable(&clicks);
    h.surface.clear();

    h.pointer_move(rect.x + 1.0, rect.y + 1.0); // hover enter
    let painted = h.frame();
    assert!(!painted.is_empty());
    assert!(h.surface.presented());
}

// ---------------------------------------------------------------------------
// Reactive propagation
// ---------------------------------------------------------------------------

#[test]
fn subscribers_fire_in_order_exactly_once_before_write_returns() {
    let cell = Cell::new(0);
    let log = Rc::new(RefCell::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());
    let _s1 = cell.subscribe(move || l1.borrow_mut().push("first"));
    let _s2 = cell.subscribe(move || l2.borrow_mut().push("second"));

    cell.set(1).unwrap();
    assert_eq!(*log.borrow(), vec!["first", "second"]);
}

#[test]
fn equal_write_notifies_nobody() {
    let cell = Cell::new(7);
    let count = Rc::new(StdCell::new(0));
    let count_c = count.clone();
    let _sub = cell.subscribe(move || count_c.set(count_c.get() + 1));

    cell.set(7).unwrap();
    assert_eq!(count.get(), 0);
    cell.set(8).unwrap();
    cell.set(8).unwrap();
    assert_eq!(count.get(), 1);
}

#[test]
fn computed_is_lazy_on_clean_reads() {
    let a = Cell::new(2);
    let calls = Rc::new(StdCell::new(0));
    let calls_c = calls.clone();
    let squared = Computed::new(&[a.source()], move || {
        calls_c.set(calls_c.get() + 1);
        a.get() * a.get()
    })
    .unwrap();

    assert_eq!(squared.get(), 4);
    let after_first_read = calls.get();
    assert_eq!(squared.get(), 4);
    assert_eq!(calls.get(), after_first_read); // zero recomputation

    a.set(3).unwrap();
    assert_eq!(squared.get(), 9);
}

#[test]
fn cycle_rejection_leaves_no_partial_registration() {
    let a = Cell::new(0);
    let aux = Cell::new(0);
    let c1 = Computed::new(&[a.source()], move || a.get()).unwrap();
    let c2 = Computed::new(&[c1.source()], move || c1.get()).unwrap();

    assert_eq!(
        c1.add_sources(&[aux.source(), c2.source()]),
        Err(ReactiveError::CyclicDependency)
    );

    // The rolled-back aux edge must not deliver notifications.
    let notified = Rc::new(StdCell::new(0));
    let notified_c = notified.clone();
    let _sub = c1.subscribe(move || notified_c.set(notified_c.get() + 1));
    aux.set(5).unwrap();
    assert_eq!(notified.get(), 0);

    // And the graph still works.
    a.set(3).unwrap();
    assert_eq!(c2.get(), 3);
}

// ---------------------------------------------------------------------------
// Reactive -> invalidation -> layout -> paint, end to end
// ---------------------------------------------------------------------------

#[test]
fn cell_write_ripples_into_a_minimal_repaint() {
    let mut h = harness();
    let root = h.app.attach_root(WidgetData::column());
    let label = h.app.insert_child(root, WidgetData::text(""));
    let untouched = h.app.insert_child(root, WidgetData::text("static"));
    let cell = Cell::new(String::from("before"));
    h.app.bind_text(label, cell);
    h.frame();
    h.surface.clear();

    cell.set(String::from("afterwards")).unwrap();
    let painted = h.frame();

    // The bound label repaints; the untouched sibling is not in the set.
    assert!(painted.contains(&label));
    assert!(!painted.contains(&untouched));
    assert!(h.surface.texts().contains(&"afterwards"));
    assert!(h.app.tracker().is_clean());
}

#[test]
fn bind_invalidation_repaints_on_any_cell_change() {
    let mut h = harness();
    let root = h.app.attach_root(
        WidgetData::column().with_style(Style::new().with_background(Color::WHITE)),
    );
    let flag = Cell::new(false);
    h.app.bind_invalidation(root, &flag, Invalidate::Paint);
    h.frame();
    h.surface.clear();

    flag.set(true).unwrap();
    let painted = h.frame();
    assert_eq!(painted, vec![root]);
}

#[test]
fn click_writes_cell_and_bound_label_updates_in_one_frame() {
    let mut h = harness();
    let count = Cell::new(0i32);
    let text = Cell::new(String::from("count: 0"));

    let root = h.app.attach_root(WidgetData::column());
    let button = h.app.insert_child(
        root,
        WidgetData::text("increment").on_click(move || {
            count.set(count.get() + 1).unwrap();
            text.set(format!("count: {}", count.get())).unwrap();
        }),
    );
    let label = h.app.insert_child(root, WidgetData::text(""));
    h.app.bind_text(label, text);
    h.frame();

    let rect = h.rect_of(button);
    h.click(rect.x + 2.0, rect.y + 2.0);
    h.frame();

    assert_eq!(h.app.tree().get(label).unwrap().text_content().as_deref(), Some("count: 1"));
    assert!(h.surface.texts().contains(&"count: 1"));
}

// ---------------------------------------------------------------------------
// Theme lifecycle
// ---------------------------------------------------------------------------

#[test]
fn theme_swap_repaints_the_whole_tree() {
    let mut h = harness();
    let root = h.app.attach_root(WidgetData::column());
    let a = h.app.insert_child(root, WidgetData::text("a"));
    let b = h.app.insert_child(root, WidgetData::text("b"));
    h.frame();
    h.surface.clear();

    h.app.set_theme(Theme::dark());
    let painted = h.frame();
    for id in [root, a, b] {
        assert!(painted.contains(&id));
    }
    assert!(h.app.tracker().is_clean());
}

// ---------------------------------------------------------------------------
// Resize
// ---------------------------------------------------------------------------

#[test]
fn resize_relayouts_and_stretch_tracks_the_new_size() {
    let mut h = harness();
    let root = h
        .app
        .attach_root(WidgetData::column().with_cross_align(CrossAlign::Stretch));
    let child = h.app.insert_child(root, WidgetData::text("wide"));
    h.frame();
    assert_eq!(h.rect_of(child).width, 200.0);

    h.resize(Size::new(320.0, 100.0));
    h.frame();
    assert_eq!(h.rect_of(child).width, 320.0);
    assert!(h.app.tracker().is_clean());
}

// ---------------------------------------------------------------------------
// Paint output shape
// ---------------------------------------------------------------------------

#[test]
fn first_frame_clips_draws_and_presents() {
    let mut h = harness();
    let root = h.app.attach_root(
        WidgetData::column().with_style(Style::new().with_background(Color::WHITE)),
    );
    h.app.insert_child(root, WidgetData::text("hello"));
    h.frame();

    let ops = &h.surface.ops;
    assert!(matches!(ops[0], DrawOp::Clip(_)));
    assert!(ops.contains(&DrawOp::Rect(Rect::new(0.0, 0.0, 200.0, 100.0))));
    assert!(ops.iter().any(|op| matches!(op, DrawOp::Text(t, _) if t == "hello")));
    assert_eq!(ops.last(), Some(&DrawOp::Present));
}

#[test]
fn hidden_widgets_are_not_drawn_and_cannot_be_clicked() {
    let clicks = Rc::new(StdCell::new(0));
    let mut h = harness();
    let root = h.app.attach_root(WidgetData::column());
    let clicks_c = clicks.clone();
    let button = h.app.insert_child(
        root,
        WidgetData::text("ghost").on_click(move || clicks_c.set(clicks_c.get() + 1)),
    );
    h.frame();
    let rect = h.rect_of(button);

    h.app.set_visible(button, false);
    h.surface.clear();
    h.frame();
    assert!(h.surface.texts().is_empty());

    h.click(rect.x + 1.0, rect.y + 1.0);
    h.frame();
    assert_eq!(clicks.get(), 0);
}
