//! Rendering capabilities and the paint walk.
//!
//! The core does not rasterize anything. It consumes two capabilities owned
//! by the embedder — [`TextMeasure`] for sizing text and [`DrawSurface`] for
//! emitting draw commands — and walks paint-dirty subtrees, translating
//! widget state into surface calls.

pub mod painter;
pub mod surface;

pub use painter::{damage_bounds, paint_all, paint_root};
pub use surface::{DrawSurface, TextMeasure};
