//! Rendered-node tree captured from a live page.
//!
//! These types mirror the geometry and computed style snapshot that the
//! in-page measurement layer produces for every inspected element.

use serde::{Deserialize, Serialize};

/// Viewport-relative box of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxRect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
    pub bottom: f32,
    pub right: f32,
}

impl BoxRect {
    pub fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
            bottom: top + height,
            right: left + width,
        }
    }
}

/// Offset of an element relative to the visual viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportOffset {
    pub top: f32,
    pub left: f32,
}

/// Four-sided edge sizes in pixels (padding, margin, border widths).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSizes {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl EdgeSizes {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// Computed styles captured for a rendered element.
///
/// String fields are `None` where the page reported the property as unset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedStyles {
    pub display: Option<String>,
    pub position: Option<String>,
    pub box_sizing: Option<String>,
    #[serde(default)]
    pub padding: EdgeSizes,
    #[serde(default)]
    pub margin: EdgeSizes,
    #[serde(default)]
    pub border: EdgeSizes,
    pub font_size: Option<f32>,
    pub font_weight: Option<String>,
    pub font_family: Option<String>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub border_radius: Option<String>,
    pub opacity: Option<f32>,
    pub overflow: Option<String>,
    pub overflow_x: Option<String>,
    pub overflow_y: Option<String>,
    pub gap: Option<String>,
    pub line_height: Option<String>,
    pub letter_spacing: Option<String>,
    pub z_index: Option<String>,
    pub flex_direction: Option<String>,
}

/// A snapshot of one live page element and its subtree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedNode {
    /// Stable, opaque identifier assigned by the measurement layer.
    #[serde(alias = "id")]
    pub agent_id: String,
    pub tag: String,
    /// CSS selector path for the element.
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub html_id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub rect: BoxRect,
    #[serde(default)]
    pub viewport_offset: ViewportOffset,
    #[serde(default)]
    pub depth: u16,
    /// Direct text of the element, excluding descendant text.
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub styles: RenderedStyles,
    /// Agent id of the parent element, filled when decoding a wire tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_agent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<RenderedNode>,
}

impl RenderedNode {
    pub fn new(agent_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Append a child, fixing up its depth and parent reference.
    pub fn with_child(mut self, mut child: RenderedNode) -> Self {
        child.parent_agent_id = Some(self.agent_id.clone());
        child.set_depth(self.depth + 1);
        self.children.push(child);
        self
    }

    fn set_depth(&mut self, depth: u16) {
        self.depth = depth;
        for child in &mut self.children {
            child.set_depth(depth + 1);
        }
    }

    /// Pre-order traversal of the subtree rooted at this node.
    pub fn walk(&self) -> Vec<&RenderedNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}
