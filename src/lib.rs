//! # quill-ui
//!
//! A retained-mode widget toolkit core: a tree of widgets with reactive
//! state, two-pass layout, dirty-region invalidation, and event dispatch,
//! rendered through an abstract 2D drawing surface.
//!
//! quill-ui deliberately owns only the hard middle of a GUI toolkit — who
//! gets what size, what must be redrawn, and how state changes ripple into
//! visual updates. Rasterization, font shaping, windowing, and the event
//! loop belong to the embedder and are consumed as capabilities.
//!
//! ## Core Systems
//!
//! - **[`geometry`]** — Point, Size, Rect, Edges primitives
//! - **[`reactive`]** — Cells, computed values, subscriptions (generation-counted, lazily recomputed)
//! - **[`style`]** — Typed style records, themes, and the resolver
//! - **[`tree`]** — Slotmap-backed widget arena with tree operations and hit-testing
//! - **[`invalidate`]** — Dirty flags, ancestor bubbling, dirty-root collection
//! - **[`layout`]** — Constraint-propagating measure/arrange engine with caching
//! - **[`event`]** — Normalized input events, bubbling dispatch, hover/press tracking
//! - **[`render`]** — Drawing/measure capability traits and the paint walk
//! - **[`app`]** — Frame-loop shell tying everything together
//! - **[`testing`]** — Headless harness with deterministic capabilities

// Foundation
pub mod geometry;

// Core systems
pub mod invalidate;
pub mod layout;
pub mod reactive;
pub mod style;
pub mod tree;

// Events and rendering
pub mod event;
pub mod render;

// Application
pub mod app;

// Test support
pub mod testing;
