//! Two-pass layout: constraints, measure, arrange.
//!
//! Layout runs once per frame over each dirty root: a pure measure pass
//! computes preferred sizes top-down under propagated [`Constraint`]s, then
//! an arrange pass commits final rectangles and clears layout-dirty flags.
//! Measurements are cached per widget and reused while the widget's inputs
//! are unchanged.

pub mod constraint;
pub mod engine;

pub use constraint::{Constraint, LayoutError};
pub use engine::LayoutEngine;
