//! Capability traits for text measurement and drawing.

use crate::geometry::{Rect, Size};
use crate::style::ResolvedStyle;

/// Text measurement capability.
///
/// Implementations must be pure: the same text and style always produce the
/// same size. Font metrics, shaping, and rasterization all live behind this
/// trait.
pub trait TextMeasure {
    /// Measure the given text under the given resolved style.
    fn measure(&self, text: &str, style: &ResolvedStyle) -> Size;
}

/// Drawing surface capability.
///
/// The paint walk emits rectangles and text runs in absolute surface
/// coordinates, clipped per dirty root. `present` is called once at the end
/// of a frame that painted anything.
pub trait DrawSurface {
    /// Fill/stroke a rectangle according to the style's background, border,
    /// and corner radius.
    fn draw_rect(&mut self, rect: Rect, style: &ResolvedStyle);

    /// Draw a run of text inside `rect` using the style's foreground color,
    /// font size, and alignment.
    fn draw_text(&mut self, text: &str, rect: Rect, style: &ResolvedStyle);

    /// Restrict subsequent drawing to `rect`.
    fn clip(&mut self, rect: Rect);

    /// Present the frame.
    fn present(&mut self);
}
