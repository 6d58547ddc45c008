//! Test harness: deterministic capabilities and a headless frame driver.
//!
//! [`FixedMeasure`] implements the text capability with character-grid
//! metrics so layout results are exact. [`RecordingSurface`] captures draw
//! calls for assertions. [`Harness`] wraps an [`App`] with an event buffer
//! and a fake clock, mirroring how an embedder drives frames.

use crate::app::App;
use crate::event::{InputEvent, Key};
use crate::geometry::{Point, Rect, Size};
use crate::render::{DrawSurface, TextMeasure};
use crate::style::{ResolvedStyle, Theme};
use crate::tree::WidgetId;

// ---------------------------------------------------------------------------
// FixedMeasure
// ---------------------------------------------------------------------------

/// Character-grid text metrics: every glyph advances by a fixed amount,
/// every line is a fixed height. Deterministic by construction.
#[derive(Debug, Clone, Copy)]
pub struct FixedMeasure {
    pub advance: f32,
    pub line_height: f32,
}

impl Default for FixedMeasure {
    fn default() -> Self {
        Self { advance: 8.0, line_height: 16.0 }
    }
}

impl TextMeasure for FixedMeasure {
    fn measure(&self, text: &str, _style: &ResolvedStyle) -> Size {
        if text.is_empty() {
            return Size::new(0.0, self.line_height);
        }
        let lines = text.lines().count().max(1);
        let widest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        Size::new(widest as f32 * self.advance, lines as f32 * self.line_height)
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface
// ---------------------------------------------------------------------------

/// One captured draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect(Rect),
    Text(String, Rect),
    Clip(Rect),
    Present,
}

/// A surface that records every call for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    /// Create an empty recording surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// All text runs drawn so far, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text(text, _) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of rectangles drawn so far.
    pub fn rect_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Rect(_))).count()
    }

    /// Whether `present` has been called at least once.
    pub fn presented(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, DrawOp::Present))
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl DrawSurface for RecordingSurface {
    fn draw_rect(&mut self, rect: Rect, _style: &ResolvedStyle) {
        self.ops.push(DrawOp::Rect(rect));
    }
    fn draw_text(&mut self, text: &str, rect: Rect, _style: &ResolvedStyle) {
        self.ops.push(DrawOp::Text(text.to_owned(), rect));
    }
    fn clip(&mut self, rect: Rect) {
        self.ops.push(DrawOp::Clip(rect));
    }
    fn present(&mut self) {
        self.ops.push(DrawOp::Present);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A headless driver: buffers simulated input, advances a fake clock, and
/// runs frames against a [`RecordingSurface`].
pub struct Harness {
    pub app: App,
    pub surface: RecordingSurface,
    viewport: Size,
    pending: Vec<InputEvent>,
    clock_ms: u64,
}

impl Harness {
    /// Create a harness with the default light theme and grid metrics.
    pub fn new(viewport: Size) -> Self {
        Self {
            app: App::new(Theme::light(), Box::new(FixedMeasure::default())),
            surface: RecordingSurface::new(),
            viewport,
            pending: Vec::new(),
            clock_ms: 0,
        }
    }

    /// Change the simulated window size (takes effect next frame).
    pub fn resize(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    fn tick(&mut self) -> u64 {
        self.clock_ms += 1;
        self.clock_ms
    }

    // ── Input simulation ─────────────────────────────────────────────

    /// Queue a pointer move.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let ts = self.tick();
        self.pending.push(InputEvent::pointer_move(ts, Point::new(x, y)));
    }

    /// Queue a primary-button press.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        let ts = self.tick();
        self.pending.push(InputEvent::pointer_down(ts, Point::new(x, y)));
    }

    /// Queue a primary-button release.
    pub fn pointer_up(&mut self, x: f32, y: f32) {
        let ts = self.tick();
        self.pending.push(InputEvent::pointer_up(ts, Point::new(x, y)));
    }

    /// Queue a full press-and-release at one point.
    pub fn click(&mut self, x: f32, y: f32) {
        self.pointer_down(x, y);
        self.pointer_up(x, y);
    }

    /// Queue a key press.
    pub fn key(&mut self, key: Key) {
        let ts = self.tick();
        self.pending.push(InputEvent::key_down(ts, key));
    }

    // ── Frames ───────────────────────────────────────────────────────

    /// Run one frame with the buffered events. Returns the repainted set.
    pub fn frame(&mut self) -> Vec<WidgetId> {
        let events = std::mem::take(&mut self.pending);
        self.app.run_frame(&events, self.viewport, &mut self.surface)
    }

    /// The committed rectangle of a widget (zero if unknown).
    pub fn rect_of(&self, id: WidgetId) -> Rect {
        self.app.tree().get(id).map(|d| d.rect()).unwrap_or(Rect::ZERO)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
