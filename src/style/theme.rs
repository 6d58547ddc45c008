//! Theme: application-wide style defaults.
//!
//! A theme is constructed once at startup and handed by reference into the
//! style resolver. Swapping the active theme happens only through
//! `App::set_theme`, which re-resolves and invalidates the whole tree —
//! there is no silent global mutation path.

use super::Color;

/// Palette and metric defaults shared by every widget that doesn't override
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    // Core colors
    pub primary: Color,
    pub background: Color,
    pub surface: Color,

    // Text colors
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_disabled: Color,

    // Border colors
    pub border: Color,

    // Typography scale
    pub font_size_small: f32,
    pub font_size_base: f32,
    pub font_size_large: f32,

    // Spacing scale
    pub spacing_small: f32,
    pub spacing_base: f32,
    pub spacing_large: f32,

    // Corner radius scale
    pub radius_small: f32,
    pub radius_base: f32,
    pub radius_large: f32,
}

impl Theme {
    /// The default light theme.
    pub fn light() -> Self {
        Self {
            primary: Color::rgb(0x00, 0x66, 0xCC),
            background: Color::rgb(0xFF, 0xFF, 0xFF),
            surface: Color::rgb(0xF8, 0xF9, 0xFA),
            text_primary: Color::rgb(0x21, 0x25, 0x29),
            text_secondary: Color::rgb(0x6C, 0x75, 0x7D),
            text_disabled: Color::rgb(0xAD, 0xB5, 0xBD),
            border: Color::rgb(0xDE, 0xE2, 0xE6),
            font_size_small: 12.0,
            font_size_base: 14.0,
            font_size_large: 18.0,
            spacing_small: 4.0,
            spacing_base: 8.0,
            spacing_large: 16.0,
            radius_small: 4.0,
            radius_base: 8.0,
            radius_large: 12.0,
        }
    }

    /// The default dark theme.
    pub fn dark() -> Self {
        Self {
            background: Color::rgb(0x12, 0x12, 0x12),
            surface: Color::rgb(0x1E, 0x1E, 0x1E),
            text_primary: Color::rgb(0xFF, 0xFF, 0xFF),
            text_secondary: Color::rgb(0xB0, 0xB0, 0xB0),
            border: Color::rgb(0x2E, 0x2E, 0x2E),
            ..Self::light()
        }
    }

    /// Derive a variant of this theme with a different primary color.
    pub fn with_primary(mut self, primary: Color) -> Self {
        self.primary = primary;
        self
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
