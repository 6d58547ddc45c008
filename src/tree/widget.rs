//! Widget records: WidgetId, content variants, interaction state.

use std::fmt;

use slotmap::new_key_type;

use crate::event::{EventResult, InputEvent};
use crate::geometry::Rect;
use crate::reactive::{Cell, Subscription};
use crate::style::{ResolvedStyle, Style};

new_key_type! {
    /// Unique identifier for a widget in the tree. Copy, lightweight (u64).
    pub struct WidgetId;
}

// ---------------------------------------------------------------------------
// Layout policy enums
// ---------------------------------------------------------------------------

/// Main axis of a stacking container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Main-axis placement of a stacking container's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainAlign {
    #[default]
    Start,
    Center,
    End,
    /// Distribute leftover main-axis space as equal gaps between children,
    /// with no gap before the first or after the last child.
    SpaceBetween,
}

/// Cross-axis placement of a stacking container's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossAlign {
    #[default]
    Start,
    Center,
    End,
    /// Fill the cross axis entirely, regardless of the child's measured size.
    Stretch,
}

// ---------------------------------------------------------------------------
// Content variants
// ---------------------------------------------------------------------------

/// The text shown by a text widget: a fixed string or a reactive cell.
#[derive(Debug, Clone)]
pub enum TextValue {
    Static(String),
    Bound(Cell<String>),
}

impl TextValue {
    /// The text as of right now.
    pub fn current(&self) -> String {
        match self {
            TextValue::Static(s) => s.clone(),
            TextValue::Bound(cell) => cell.get(),
        }
    }

    /// A change marker for the measure cache: bound text changes whenever
    /// the cell's generation advances, static text only via `set_text`
    /// (which bumps the widget revision instead).
    pub(crate) fn fingerprint(&self) -> u64 {
        match self {
            TextValue::Static(_) => 0,
            TextValue::Bound(cell) => cell.generation(),
        }
    }
}

/// Leaf content: a run of text measured through the text capability.
#[derive(Debug, Clone)]
pub struct TextContent {
    pub text: TextValue,
}

/// Stacking container content: children laid out along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerContent {
    pub axis: Axis,
    /// Fixed gap between adjacent children along the main axis.
    pub spacing: f32,
    pub main_align: MainAlign,
    pub cross_align: CrossAlign,
}

/// Overlay content: every child gets the container's whole content box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayContent;

/// Closed set of widget content variants.
///
/// Each variant carries the data its measure/arrange/paint behavior needs;
/// there is no widget subclassing, only these cases.
#[derive(Debug, Clone)]
pub enum Content {
    Text(TextContent),
    Container(ContainerContent),
    Overlay(OverlayContent),
}

// ---------------------------------------------------------------------------
// Interaction state
// ---------------------------------------------------------------------------

/// Pointer interaction state machine: `Idle -> Hovered -> Pressed -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Hovered,
    Pressed,
}

// ---------------------------------------------------------------------------
// WidgetData
// ---------------------------------------------------------------------------

/// Handler invoked when a press-and-release completes inside the widget.
pub type ClickHandler = Box<dyn FnMut()>;
/// Handler offered input events during bubbling.
pub type EventHandler = Box<dyn FnMut(&InputEvent) -> EventResult>;

/// One widget record.
///
/// Geometry (`rect`) is only meaningful while the widget is layout-clean;
/// dirty tracking lives in the invalidation tracker, not here.
pub struct WidgetData {
    pub content: Content,
    /// Explicit style overrides; merged over theme/inherited on resolve.
    pub overrides: Style,
    /// Cached resolved style. `None` until the widget is attached.
    pub(crate) resolved: Option<ResolvedStyle>,
    /// Committed absolute geometry from the last arrange pass.
    pub(crate) rect: Rect,
    pub visible: bool,
    /// Non-interactive widgets are skipped as hit-test targets but their
    /// children are still considered.
    pub interactive: bool,
    pub(crate) interaction: Interaction,
    pub(crate) on_click: Option<ClickHandler>,
    pub(crate) on_event: Option<EventHandler>,
    /// Reactive subscriptions owned by this widget; disposed on destroy.
    pub(crate) subscriptions: Vec<Subscription>,
    /// Bumped on every style/content mutation; feeds the measure cache.
    pub(crate) revision: u64,
}

impl WidgetData {
    fn new(content: Content) -> Self {
        Self {
            content,
            overrides: Style::new(),
            resolved: None,
            rect: Rect::ZERO,
            visible: true,
            interactive: true,
            interaction: Interaction::Idle,
            on_click: None,
            on_event: None,
            subscriptions: Vec::new(),
            revision: 0,
        }
    }

    /// A text leaf with fixed content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Content::Text(TextContent { text: TextValue::Static(text.into()) }))
    }

    /// A text leaf bound to a reactive cell.
    pub fn bound_text(cell: Cell<String>) -> Self {
        Self::new(Content::Text(TextContent { text: TextValue::Bound(cell) }))
    }

    /// A vertical stacking container.
    pub fn column() -> Self {
        Self::new(Content::Container(ContainerContent {
            axis: Axis::Vertical,
            spacing: 0.0,
            main_align: MainAlign::Start,
            cross_align: CrossAlign::Start,
        }))
    }

    /// A horizontal stacking container.
    pub fn row() -> Self {
        Self::new(Content::Container(ContainerContent {
            axis: Axis::Horizontal,
            spacing: 0.0,
            main_align: MainAlign::Start,
            cross_align: CrossAlign::Start,
        }))
    }

    /// An overlay container: children share the content box.
    pub fn overlay() -> Self {
        Self::new(Content::Overlay(OverlayContent))
    }

    // ── Builders ─────────────────────────────────────────────────────

    /// Set the style overrides (builder).
    pub fn with_style(mut self, style: Style) -> Self {
        self.overrides = style;
        self
    }

    /// Set the main-axis gap between children (builder, containers only).
    pub fn with_spacing(mut self, spacing: f32) -> Self {
        if let Content::Container(c) = &mut self.content {
            c.spacing = spacing;
        }
        self
    }

    /// Set the main-axis alignment (builder, containers only).
    pub fn with_main_align(mut self, align: MainAlign) -> Self {
        if let Content::Container(c) = &mut self.content {
            c.main_align = align;
        }
        self
    }

    /// Set the cross-axis alignment (builder, containers only).
    pub fn with_cross_align(mut self, align: CrossAlign) -> Self {
        if let Content::Container(c) = &mut self.content {
            c.cross_align = align;
        }
        self
    }

    /// Set visibility (builder).
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Mark the widget (non-)interactive (builder).
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Attach a click handler (builder).
    pub fn on_click(mut self, handler: impl FnMut() + 'static) -> Self {
        self.on_click = Some(Box::new(handler));
        self
    }

    /// Attach a bubbling event handler (builder).
    pub fn on_event(mut self, handler: impl FnMut(&InputEvent) -> EventResult + 'static) -> Self {
        self.on_event = Some(Box::new(handler));
        self
    }

    // ── Accessors & mutators ─────────────────────────────────────────

    /// Committed geometry from the last completed arrange pass.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The cached resolved style, if the widget has been attached.
    pub fn resolved_style(&self) -> Option<&ResolvedStyle> {
        self.resolved.as_ref()
    }

    /// Current pointer interaction state.
    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// The widget's current text, if it is a text widget.
    pub fn text_content(&self) -> Option<String> {
        match &self.content {
            Content::Text(t) => Some(t.text.current()),
            _ => None,
        }
    }

    /// Replace a text widget's content with a fixed string. No-op for other
    /// variants. Bumps the revision so cached measurements are discarded.
    pub fn set_text(&mut self, text: impl Into<String>) {
        if let Content::Text(t) = &mut self.content {
            t.text = TextValue::Static(text.into());
            self.revision += 1;
        }
    }

    /// Replace the style overrides. Bumps the revision.
    pub fn set_style(&mut self, style: Style) {
        self.overrides = style;
        self.revision += 1;
    }

    /// Store a subscription to be disposed together with this widget.
    pub fn own_subscription(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    /// Content + bound-cell fingerprint for the measure cache.
    pub(crate) fn measure_fingerprint(&self) -> (u64, u64) {
        let text_gen = match &self.content {
            Content::Text(t) => t.text.fingerprint(),
            _ => 0,
        };
        (self.revision, text_gen)
    }
}

impl fmt::Debug for WidgetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetData")
            .field("content", &self.content)
            .field("rect", &self.rect)
            .field("visible", &self.visible)
            .field("interactive", &self.interactive)
            .field("interaction", &self.interaction)
            .field("has_on_click", &self.on_click.is_some())
            .field("has_on_event", &self.on_event.is_some())
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
