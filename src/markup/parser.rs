//! Tolerant markup parser producing an [`ExpectedNode`] tree.
//!
//! The parser never fails. Unclosed elements, stray closing tags, comments
//! and unparsable fragments degrade to a best-effort partial tree.

use tracing::trace;

use crate::types::ExpectedNode;

/// Elements that never open a child scope, with or without a trailing `/`.
const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Maximum characters kept for an element's text content.
pub const TEXT_CONTENT_LIMIT: usize = 100;

/// Nesting limit; deeper markup is kept as text of the innermost element.
pub const MAX_MARKUP_DEPTH: usize = 256;

/// Parse an expected-markup fragment.
///
/// A single top-level element becomes the root. Several top-level elements
/// are wrapped in a synthetic `div`. Empty or unparsable input yields a bare
/// `div`.
pub fn parse_markup(markup: &str) -> ExpectedNode {
    let mut nodes = parse_fragment(markup, 0);
    match nodes.len() {
        0 => {
            trace!("markup produced no elements; using default root");
            ExpectedNode::default()
        }
        1 => nodes.remove(0),
        _ => {
            let mut root = ExpectedNode::default();
            root.children = nodes;
            root
        }
    }
}

struct OpenTag {
    name: String,
    id: Option<String>,
    classes: Vec<String>,
    style: Option<String>,
    self_closing: bool,
    /// Byte offset just past the closing `>`.
    end: usize,
}

fn parse_fragment(input: &str, depth: usize) -> Vec<ExpectedNode> {
    let mut nodes = Vec::new();
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('<') {
        let lt = pos + offset;
        let rest = &input[lt + 1..];

        if rest.starts_with("!--") {
            pos = match input[lt..].find("-->") {
                Some(end) => lt + end + 3,
                None => input.len(),
            };
            continue;
        }
        if rest.starts_with('!') || rest.starts_with('?') || rest.trim_start().starts_with('/') {
            // Doctype, processing instruction, or a stray closing tag.
            pos = match find_tag_end(input, lt + 1) {
                Some(gt) => gt + 1,
                None => input.len(),
            };
            continue;
        }

        let Some(tag) = parse_open_tag(input, lt) else {
            pos = lt + 1;
            continue;
        };

        let mut node = ExpectedNode::new(tag.name.clone());
        node.id = tag.id;
        node.classes = tag.classes;
        node.raw_inline_style = tag.style;

        if tag.self_closing || VOID_TAGS.contains(&tag.name.as_str()) {
            pos = tag.end;
            nodes.push(node);
            continue;
        }

        match find_matching_close(input, &tag.name, tag.end) {
            Some((inner_end, close_end)) => {
                let inner = &input[tag.end..inner_end];
                if depth < MAX_MARKUP_DEPTH {
                    node.children = parse_fragment(inner, depth + 1);
                }
                if node.children.is_empty() {
                    node.text_content = visible_text(inner);
                }
                pos = close_end;
            }
            None => {
                // No explicit close: the element keeps no children, and the
                // text up to the next tag is its content.
                trace!(tag = %tag.name, "unclosed element");
                let next = input[tag.end..]
                    .find('<')
                    .map_or(input.len(), |i| tag.end + i);
                node.text_content = visible_text(&input[tag.end..next]);
                pos = next;
            }
        }
        nodes.push(node);
    }

    nodes
}

/// Offset of the `>` that ends the tag starting at `from`, skipping any `>`
/// inside quoted attribute values.
fn find_tag_end(input: &str, from: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return Some(i),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn parse_open_tag(input: &str, lt: usize) -> Option<OpenTag> {
    let gt = find_tag_end(input, lt + 1)?;
    let content = &input[lt + 1..gt];
    let trimmed = content.trim_start();

    let name_len = trimmed
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(trimmed.len());
    let name = &trimmed[..name_len];
    if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':')
    {
        return None;
    }

    let attrs_src = &trimmed[name_len..];
    let mut id = None;
    let mut classes = Vec::new();
    let mut style = None;
    for (key, value) in parse_attributes(attrs_src) {
        match key.as_str() {
            "id" => id = value.filter(|v| !v.is_empty()),
            "class" | "classname" => {
                if let Some(v) = value {
                    classes = v.split_whitespace().map(str::to_string).collect();
                }
            }
            "style" => style = value.filter(|v| !v.trim().is_empty()),
            _ => {}
        }
    }

    Some(OpenTag {
        name: name.to_ascii_lowercase(),
        id,
        classes,
        style,
        self_closing: content.trim_end().ends_with('/'),
        end: gt + 1,
    })
}

fn parse_attributes(src: &str) -> Vec<(String, Option<String>)> {
    let chars: Vec<char> = src.chars().collect();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && (chars[i].is_whitespace() || chars[i] == '/') {
            i += 1;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '=' && chars[i] != '/' {
            i += 1;
        }
        if start == i {
            i += 1;
            continue;
        }
        let key: String = chars[start..i].iter().collect::<String>().to_ascii_lowercase();

        let mut j = i;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        if j < chars.len() && chars[j] == '=' {
            j += 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            let value = if j < chars.len() && (chars[j] == '"' || chars[j] == '\'') {
                let quote = chars[j];
                j += 1;
                let value_start = j;
                while j < chars.len() && chars[j] != quote {
                    if chars[j] == '\\' {
                        j += 1;
                    }
                    j += 1;
                }
                let value: String = chars[value_start..j.min(chars.len())].iter().collect();
                j += 1;
                value
            } else {
                let value_start = j;
                while j < chars.len() && !chars[j].is_whitespace() {
                    j += 1;
                }
                chars[value_start..j].iter().collect()
            };
            attrs.push((key, Some(value)));
            i = j;
        } else {
            attrs.push((key, None));
        }
    }

    attrs
}

/// Is `input[at..]` the tag name `name` followed by a name boundary?
fn name_at(input: &str, at: usize, name: &str) -> bool {
    let end = at + name.len();
    if end > input.len() || !input.is_char_boundary(end) {
        return false;
    }
    if !input[at..end].eq_ignore_ascii_case(name) {
        return false;
    }
    match input[end..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || c == '>' || c == '/',
    }
}

fn skip_whitespace(input: &str, mut at: usize) -> usize {
    let bytes = input.as_bytes();
    while at < bytes.len() && bytes[at].is_ascii_whitespace() {
        at += 1;
    }
    at
}

/// Find the closing tag matching an element named `name` whose content starts
/// at `from`, tracking nested elements of the same name.
///
/// Returns `(inner_end, close_end)`: where the content ends and the offset just
/// past the closing tag.
fn find_matching_close(input: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut pos = from;

    while let Some(offset) = input[pos..].find('<') {
        let lt = pos + offset;
        let after = skip_whitespace(input, lt + 1);

        if input[after..].starts_with('/') {
            let name_start = skip_whitespace(input, after + 1);
            let gt = find_tag_end(input, lt + 1);
            if name_at(input, name_start, name) {
                if depth == 0 {
                    return Some((lt, gt.map_or(input.len(), |g| g + 1)));
                }
                depth -= 1;
            }
            pos = gt.map_or(input.len(), |g| g + 1);
            continue;
        }

        if input[lt + 1..].starts_with("!--") {
            pos = input[lt..].find("-->").map_or(input.len(), |end| lt + end + 3);
            continue;
        }

        if name_at(input, after, name) {
            match find_tag_end(input, lt + 1) {
                Some(gt) => {
                    if !input[lt + 1..gt].trim_end().ends_with('/') {
                        depth += 1;
                    }
                    pos = gt + 1;
                }
                None => return None,
            }
            continue;
        }

        pos = lt + 1;
    }

    None
}

/// Whitespace-collapsed, tag-stripped text, capped at [`TEXT_CONTENT_LIMIT`].
fn visible_text(inner: &str) -> Option<String> {
    let mut text = String::with_capacity(inner.len());
    let mut in_tag = false;
    for c in inner.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(TEXT_CONTENT_LIMIT).collect())
}
