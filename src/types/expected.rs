//! Expected-structure tree parsed from design-intent markup.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Style declarations inferred for an expected node, keyed by camelCase
/// property name (`paddingTop`, `backgroundColor`, ...).
pub type InferredStyles = IndexMap<String, String>;

/// A node in the expected tree.
///
/// Inferred styles are not stored on the node; they are computed on demand
/// and memoized by [`crate::matcher::StyleCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_inline_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default)]
    pub children: Vec<ExpectedNode>,
}

impl Default for ExpectedNode {
    fn default() -> Self {
        Self::new("div")
    }
}

impl ExpectedNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            raw_inline_style: None,
            text_content: None,
            children: Vec::new(),
        }
    }

    /// Pre-order traversal; the position in the returned list is the node's
    /// stable expected index (root is 0).
    pub fn walk(&self) -> Vec<&ExpectedNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Render the node back to markup. Re-parsing the result yields an
    /// isomorphic tree.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if let Some(id) = &self.id {
            out.push_str(&format!(" id=\"{}\"", id));
        }
        if !self.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", self.classes.join(" ")));
        }
        if let Some(style) = &self.raw_inline_style {
            out.push_str(&format!(" style=\"{}\"", style));
        }
        out.push('>');
        if self.children.is_empty() {
            if let Some(text) = &self.text_content {
                out.push_str(text);
            }
        } else {
            for child in &self.children {
                child.write_markup(out);
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}
