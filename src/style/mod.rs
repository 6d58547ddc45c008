//! Styling: typed style records, themes, and the resolver.
//!
//! A [`Style`] holds per-widget overrides with every property optional
//! (`None` = unset). [`resolve`] merges overrides over the inherited style
//! and the active [`Theme`]'s defaults into a fully-populated
//! [`ResolvedStyle`], which is cached on the widget between invalidations.

pub mod theme;

pub use theme::Theme;

use crate::geometry::Edges;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An sRGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    /// Opaque color from RGB channels.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Color from RGBA channels.
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

// ---------------------------------------------------------------------------
// TextAlign
// ---------------------------------------------------------------------------

/// Horizontal text alignment within a widget's content box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

// ---------------------------------------------------------------------------
// Style
// ---------------------------------------------------------------------------

/// Per-widget style overrides. Each field is `Option<T>` — `None` means
/// unset (resolved from the inherited style or the theme).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    // Colors
    pub background: Option<Color>,
    pub foreground: Option<Color>,
    pub border_color: Option<Color>,

    // Border & shape
    pub border_width: Option<f32>,
    pub corner_radius: Option<f32>,

    // Typography
    pub font_size: Option<f32>,
    pub text_align: Option<TextAlign>,

    // Sizing
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub min_width: Option<f32>,
    pub min_height: Option<f32>,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,

    // Spacing
    pub padding: Option<Edges>,
}

impl Style {
    /// Create a new `Style` with all fields unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `over` on top of `self`: for each field, a set value in `over`
    /// wins, an unset one keeps `self`'s value. Pure.
    pub fn merge(&self, over: &Style) -> Style {
        fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
            if over.is_some() {
                over.clone()
            } else {
                base.clone()
            }
        }

        Style {
            background: pick(&self.background, &over.background),
            foreground: pick(&self.foreground, &over.foreground),
            border_color: pick(&self.border_color, &over.border_color),

            border_width: pick(&self.border_width, &over.border_width),
            corner_radius: pick(&self.corner_radius, &over.corner_radius),

            font_size: pick(&self.font_size, &over.font_size),
            text_align: pick(&self.text_align, &over.text_align),

            width: pick(&self.width, &over.width),
            height: pick(&self.height, &over.height),
            min_width: pick(&self.min_width, &over.min_width),
            min_height: pick(&self.min_height, &over.min_height),
            max_width: pick(&self.max_width, &over.max_width),
            max_height: pick(&self.max_height, &over.max_height),

            padding: pick(&self.padding, &over.padding),
        }
    }

    /// Returns `true` if no property is set.
    pub fn is_empty(&self) -> bool {
        self == &Style::default()
    }

    // ── Builders ─────────────────────────────────────────────────────

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_foreground(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    pub fn with_border(mut self, color: Color, width: f32) -> Self {
        self.border_color = Some(color);
        self.border_width = Some(width);
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_text_align(mut self, align: TextAlign) -> Self {
        self.text_align = Some(align);
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_padding(mut self, padding: Edges) -> Self {
        self.padding = Some(padding);
        self
    }
}

// ---------------------------------------------------------------------------
// ResolvedStyle
// ---------------------------------------------------------------------------

/// A fully-populated style record, produced by [`resolve`].
///
/// Nullable properties (background, border color) stay `Option` with a
/// defined `None` default — "not drawn" is a legitimate resolved state, not
/// an unresolved one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub background: Option<Color>,
    pub foreground: Color,
    pub border_color: Option<Color>,
    pub border_width: f32,
    pub corner_radius: f32,
    pub font_size: f32,
    pub text_align: TextAlign,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub min_width: Option<f32>,
    pub min_height: Option<f32>,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
    pub padding: Edges,
}

/// Resolve a widget's effective style.
///
/// Precedence, lowest to highest: theme defaults, inherited values (only the
/// inheritable properties: foreground, font size, text alignment), the
/// widget's own overrides. Pure — same inputs, same output.
pub fn resolve(overrides: &Style, inherited: Option<&ResolvedStyle>, theme: &Theme) -> ResolvedStyle {
    let foreground = overrides
        .foreground
        .or(inherited.map(|s| s.foreground))
        .unwrap_or(theme.text_primary);
    let font_size = overrides
        .font_size
        .or(inherited.map(|s| s.font_size))
        .unwrap_or(theme.font_size_base);
    let text_align = overrides
        .text_align
        .or(inherited.map(|s| s.text_align))
        .unwrap_or_default();

    ResolvedStyle {
        background: overrides.background,
        foreground,
        border_color: overrides.border_color,
        border_width: overrides.border_width.unwrap_or(0.0),
        corner_radius: overrides.corner_radius.unwrap_or(0.0),
        font_size,
        text_align,
        width: overrides.width,
        height: overrides.height,
        min_width: overrides.min_width,
        min_height: overrides.min_height,
        max_width: overrides.max_width,
        max_height: overrides.max_height,
        padding: overrides.padding.unwrap_or(Edges::ZERO),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
