//! Compact binary transport for rendered-node trees.
//!
//! All integers and floats are little-endian. A payload is:
//!
//! ```text
//! magic u32 | version u16 | string count u32 | (len u16, utf-8 bytes)*
//! | root node
//! ```
//!
//! Every string in the tree is stored once in the dictionary and referenced
//! by a 1-based `u16` index; index 0 means absent. Nodes are written
//! depth-first in pre-order:
//!
//! ```text
//! tag selector agentId htmlId textContent           u16 x5
//! class count u16, class indices u16*
//! rect top left width height bottom right           f32 x6
//! viewport offset top left                          f32 x2
//! display position boxSizing                        u16 x3
//! fontSize f32, fontWeight u16, fontFamily u16, opacity f32
//! color backgroundColor                             u16 x2
//! padding margin border (top right bottom left)     f32 x12
//! depth u16, child count u16, children*
//! ```
//!
//! Absent `fontSize`/`opacity` travel as NaN. Style fields outside this
//! layout are reset to their CSS initial values on decode.

mod codec;
mod envelope;

use thiserror::Error;

pub use codec::{deserialize, serialize};
pub use envelope::{decode_envelope, encode_envelope, Envelope};

/// Payloads start with the bytes `CALP`.
pub const MAGIC: u32 = u32::from_le_bytes(*b"CALP");
pub const FORMAT_VERSION: u16 = 1;
/// Deepest level a node may sit at on encode and decode; the root is level 0.
pub const MAX_WIRE_DEPTH: usize = 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("bad magic 0x{found:08x}; not a Caliper tree payload")]
    BadMagic { found: u32 },

    #[error("unsupported format version {found} (this build reads version {})", FORMAT_VERSION)]
    UnsupportedVersion { found: u16 },

    #[error("unexpected end of payload at byte {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("invalid UTF-8 in string dictionary at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("string index {index} out of range (dictionary has {len} entries)")]
    StringIndexOutOfRange { index: u16, len: usize },

    #[error("tree has more than {} distinct strings", u16::MAX)]
    DictionaryOverflow,

    #[error("string of {len} bytes exceeds the {} byte limit", u16::MAX)]
    StringTooLong { len: usize },

    #[error("{what} count {count} exceeds the {} limit", u16::MAX)]
    CountOverflow { what: &'static str, count: usize },

    #[error("envelope needs {needed} bytes but only {available} are present")]
    EnvelopeTooShort { needed: usize, available: usize },

    #[error("tree nesting exceeds {} levels", MAX_WIRE_DEPTH)]
    DepthExceeded,

    #[error("envelope message: {0}")]
    Json(#[from] serde_json::Error),
}
