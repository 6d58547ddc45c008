//! The widget tree: records, arena, tree operations, hit-testing.
//!
//! Widgets are one concrete record ([`WidgetData`]) parameterized by a closed
//! set of content variants, stored in a slotmap arena ([`WidgetTree`]) with
//! parent/child links in secondary maps.

pub mod tree;
pub mod widget;

pub use tree::{TreeError, WidgetTree};
pub use widget::{
    Axis, Content, ContainerContent, CrossAlign, Interaction, MainAlign, OverlayContent,
    TextContent, TextValue, WidgetData, WidgetId,
};
