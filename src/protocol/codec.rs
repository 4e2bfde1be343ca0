//! Tree encoder and decoder.

use indexmap::IndexSet;
use tracing::{debug, trace};

use super::{ProtocolError, FORMAT_VERSION, MAGIC, MAX_WIRE_DEPTH};
use crate::types::{BoxRect, EdgeSizes, RenderedNode, RenderedStyles, ViewportOffset};

type Result<T> = std::result::Result<T, ProtocolError>;

/// Size of a node record with no classes.
const MIN_NODE_BYTES: usize = 118;

/// Encode a rendered tree.
pub fn serialize(root: &RenderedNode) -> Result<Vec<u8>> {
    let nodes = preorder(root)?;
    let mut strings = IndexSet::new();
    for &node in &nodes {
        collect_strings(node, &mut strings);
    }
    if strings.len() > u16::MAX as usize {
        return Err(ProtocolError::DictionaryOverflow);
    }

    let mut writer = Writer::default();
    writer.u32(MAGIC);
    writer.u16(FORMAT_VERSION);
    writer.u32(strings.len() as u32);
    for s in &strings {
        let len = u16::try_from(s.len()).map_err(|_| ProtocolError::StringTooLong { len: s.len() })?;
        writer.u16(len);
        writer.bytes(s.as_bytes());
    }

    let encoder = Encoder { strings: &strings };
    for &node in &nodes {
        encoder.node(&mut writer, node)?;
    }
    debug!(
        bytes = writer.buf.len(),
        nodes = nodes.len(),
        strings = strings.len(),
        "serialized rendered tree"
    );
    Ok(writer.buf)
}

/// Decode a rendered tree, rebuilding parent references.
///
/// Fails on a wrong magic number, an unknown version, or a truncated or
/// inconsistent payload.
pub fn deserialize(bytes: &[u8]) -> Result<RenderedNode> {
    let mut reader = Reader::new(bytes);
    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ProtocolError::BadMagic { found: magic });
    }
    let version = reader.u16()?;
    if version != FORMAT_VERSION {
        return Err(ProtocolError::UnsupportedVersion { found: version });
    }

    let count = reader.u32()? as usize;
    // Each entry takes at least its length prefix.
    if count > reader.remaining() / 2 {
        return Err(ProtocolError::UnexpectedEof {
            offset: reader.offset,
            needed: count * 2,
        });
    }
    let mut strings = Vec::with_capacity(count);
    for _ in 0..count {
        let len = reader.u16()? as usize;
        let offset = reader.offset;
        let raw = reader.take(len)?;
        let s = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8 { offset })?;
        strings.push(s.to_string());
    }

    let decoder = Decoder { strings: &strings };
    let root = decoder.tree(&mut reader)?;
    if reader.remaining() > 0 {
        trace!(trailing = reader.remaining(), "ignoring bytes after root node");
    }
    Ok(root)
}

/// Nodes in wire order. The root is level 0 and no node may sit deeper than
/// `MAX_WIRE_DEPTH`.
fn preorder(root: &RenderedNode) -> Result<Vec<&RenderedNode>> {
    let mut out = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((node, level)) = stack.pop() {
        if level > MAX_WIRE_DEPTH {
            return Err(ProtocolError::DepthExceeded);
        }
        out.push(node);
        stack.extend(node.children.iter().rev().map(|child| (child, level + 1)));
    }
    Ok(out)
}

fn collect_strings<'a>(node: &'a RenderedNode, strings: &mut IndexSet<&'a str>) {
    let s = &node.styles;
    let required = [node.tag.as_str(), node.selector.as_str(), node.agent_id.as_str()];
    let optional = [
        &node.html_id,
        &node.text_content,
        &s.display,
        &s.position,
        &s.box_sizing,
        &s.font_weight,
        &s.font_family,
        &s.color,
        &s.background_color,
    ];
    strings.extend(required);
    strings.extend(optional.into_iter().flatten().map(String::as_str));
    strings.extend(node.classes.iter().map(String::as_str));
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    fn edges(&mut self, e: &EdgeSizes) {
        for v in [e.top, e.right, e.bottom, e.left] {
            self.f32(v);
        }
    }
}

struct Encoder<'a> {
    strings: &'a IndexSet<&'a str>,
}

impl Encoder<'_> {
    fn index(&self, s: &str) -> u16 {
        // Every string was collected in the pre-pass and the dictionary size
        // was checked, so the lookup and the cast always succeed.
        self.strings
            .get_index_of(s)
            .map(|i| (i + 1) as u16)
            .unwrap_or(0)
    }

    fn opt(&self, s: &Option<String>) -> u16 {
        s.as_deref().map_or(0, |s| self.index(s))
    }

    fn count(what: &'static str, count: usize) -> Result<u16> {
        u16::try_from(count).map_err(|_| ProtocolError::CountOverflow { what, count })
    }

    /// Write one node record. Children follow as separate records.
    fn node(&self, w: &mut Writer, node: &RenderedNode) -> Result<()> {
        w.u16(self.index(&node.tag));
        w.u16(self.index(&node.selector));
        w.u16(self.index(&node.agent_id));
        w.u16(self.opt(&node.html_id));
        w.u16(self.opt(&node.text_content));

        w.u16(Self::count("class", node.classes.len())?);
        for class in &node.classes {
            w.u16(self.index(class));
        }

        let r = &node.rect;
        for v in [r.top, r.left, r.width, r.height, r.bottom, r.right] {
            w.f32(v);
        }
        w.f32(node.viewport_offset.top);
        w.f32(node.viewport_offset.left);

        let s = &node.styles;
        w.u16(self.opt(&s.display));
        w.u16(self.opt(&s.position));
        w.u16(self.opt(&s.box_sizing));
        w.f32(s.font_size.unwrap_or(f32::NAN));
        w.u16(self.opt(&s.font_weight));
        w.u16(self.opt(&s.font_family));
        w.f32(s.opacity.unwrap_or(f32::NAN));
        w.u16(self.opt(&s.color));
        w.u16(self.opt(&s.background_color));
        w.edges(&s.padding);
        w.edges(&s.margin);
        w.edges(&s.border);

        w.u16(node.depth);
        w.u16(Self::count("child", node.children.len())?);
        Ok(())
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtocolError::UnexpectedEof {
                offset: self.offset,
                needed: n - self.remaining(),
            });
        }
        let out = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn edges(&mut self) -> Result<EdgeSizes> {
        Ok(EdgeSizes {
            top: self.f32()?,
            right: self.f32()?,
            bottom: self.f32()?,
            left: self.f32()?,
        })
    }
}

struct Decoder<'a> {
    strings: &'a [String],
}

impl Decoder<'_> {
    fn opt(&self, index: u16) -> Result<Option<String>> {
        if index == 0 {
            return Ok(None);
        }
        self.strings
            .get(index as usize - 1)
            .cloned()
            .map(Some)
            .ok_or(ProtocolError::StringIndexOutOfRange {
                index,
                len: self.strings.len(),
            })
    }

    fn string(&self, reader: &mut Reader) -> Result<String> {
        Ok(self.opt(reader.u16()?)?.unwrap_or_default())
    }

    fn opt_string(&self, reader: &mut Reader) -> Result<Option<String>> {
        self.opt(reader.u16()?)
    }

    /// Rebuild the tree from pre-order records with an explicit stack of
    /// nodes still waiting for children.
    fn tree(&self, r: &mut Reader) -> Result<RenderedNode> {
        let mut open: Vec<(RenderedNode, u16)> = Vec::new();
        'records: loop {
            if open.len() > MAX_WIRE_DEPTH {
                return Err(ProtocolError::DepthExceeded);
            }
            let (mut node, child_count) = self.node(r)?;
            node.parent_agent_id = open.last().map(|(parent, _)| parent.agent_id.clone());
            if child_count > 0 {
                open.push((node, child_count));
                continue;
            }

            let mut finished = node;
            loop {
                let Some((mut parent, pending)) = open.pop() else {
                    return Ok(finished);
                };
                parent.children.push(finished);
                if pending > 1 {
                    open.push((parent, pending - 1));
                    continue 'records;
                }
                finished = parent;
            }
        }
    }

    /// Read one node record, returning it with its declared child count.
    fn node(&self, r: &mut Reader) -> Result<(RenderedNode, u16)> {
        let tag = self.string(r)?;
        let selector = self.string(r)?;
        let agent_id = self.string(r)?;
        let html_id = self.opt_string(r)?;
        let text_content = self.opt_string(r)?;

        let class_count = r.u16()?;
        let mut classes = Vec::with_capacity((class_count as usize).min(r.remaining() / 2));
        for _ in 0..class_count {
            classes.push(self.string(r)?);
        }

        let rect = BoxRect {
            top: r.f32()?,
            left: r.f32()?,
            width: r.f32()?,
            height: r.f32()?,
            bottom: r.f32()?,
            right: r.f32()?,
        };
        let viewport_offset = ViewportOffset {
            top: r.f32()?,
            left: r.f32()?,
        };

        let display = self.opt_string(r)?;
        let position = self.opt_string(r)?;
        let box_sizing = self.opt_string(r)?;
        let font_size = present(r.f32()?);
        let font_weight = self.opt_string(r)?;
        let font_family = self.opt_string(r)?;
        let opacity = present(r.f32()?);
        let color = self.opt_string(r)?;
        let background_color = self.opt_string(r)?;
        let padding = r.edges()?;
        let margin = r.edges()?;
        let border = r.edges()?;

        let styles = RenderedStyles {
            display,
            position,
            box_sizing,
            padding,
            margin,
            border,
            font_size,
            font_weight,
            font_family,
            color,
            background_color,
            opacity,
            ..wire_defaults()
        };

        let depth = r.u16()?;
        let child_count = r.u16()?;
        let capacity = (child_count as usize).min(r.remaining() / MIN_NODE_BYTES);

        let node = RenderedNode {
            agent_id,
            tag,
            selector,
            html_id,
            classes,
            rect,
            viewport_offset,
            depth,
            text_content,
            styles,
            parent_agent_id: None,
            children: Vec::with_capacity(capacity),
        };
        Ok((node, child_count))
    }
}

fn present(v: f32) -> Option<f32> {
    (!v.is_nan()).then_some(v)
}

/// Values for style fields the wire format does not carry.
fn wire_defaults() -> RenderedStyles {
    let s = |v: &str| Some(v.to_string());
    RenderedStyles {
        border_radius: s("0"),
        overflow: s("visible"),
        overflow_x: s("visible"),
        overflow_y: s("visible"),
        gap: s("normal"),
        line_height: s("normal"),
        letter_spacing: s("normal"),
        z_index: s("auto"),
        flex_direction: None,
        ..RenderedStyles::default()
    }
}
