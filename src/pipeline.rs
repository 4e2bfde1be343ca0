use std::path::Path;

use caliper_lib::protocol::{self, MAGIC};
use caliper_lib::{CaliperError, ContextMetrics, DesignTokenDictionary, RenderedNode};
use tracing::debug;

/// A rendered tree plus the encoding it arrived in.
pub struct LoadedTree {
    pub root: RenderedNode,
    pub binary: bool,
}

/// Load a rendered tree from JSON or from the binary wire format.
///
/// The binary format is chosen when the file starts with the wire magic or
/// carries a `.bin` extension; anything else is parsed as JSON.
pub fn load_rendered_tree(path: &Path) -> Result<LoadedTree, CaliperError> {
    let bytes = read_input(path, "Rendered tree")?;
    if is_binary_tree(path, &bytes) {
        debug!(path = %path.display(), len = bytes.len(), "decoding binary rendered tree");
        let root = protocol::deserialize(&bytes)?;
        return Ok(LoadedTree { root, binary: true });
    }
    let root = serde_json::from_slice(&bytes)?;
    Ok(LoadedTree {
        root,
        binary: false,
    })
}

fn is_binary_tree(path: &Path, bytes: &[u8]) -> bool {
    let has_magic = bytes.len() >= 4 && bytes[..4] == MAGIC.to_le_bytes();
    let bin_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("bin"));
    has_magic || bin_ext
}

/// Load context metrics from a JSON file; missing fields take their defaults.
pub fn load_metrics(path: &Path) -> Result<ContextMetrics, CaliperError> {
    let bytes = read_input(path, "Metrics file")?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Load a token dictionary, or an empty one when no path is configured.
pub fn load_tokens(path: Option<&Path>) -> Result<DesignTokenDictionary, CaliperError> {
    match path {
        Some(path) => DesignTokenDictionary::from_path(path),
        None => Ok(DesignTokenDictionary::default()),
    }
}

pub fn load_markup(path: &Path) -> Result<String, CaliperError> {
    let bytes = read_input(path, "Markup file")?;
    String::from_utf8(bytes)
        .map_err(|e| CaliperError::Config(format!("Markup file {} is not UTF-8: {}", path.display(), e)))
}

fn read_input(path: &Path, label: &str) -> Result<Vec<u8>, CaliperError> {
    if !path.exists() {
        return Err(CaliperError::Config(format!(
            "{} not found: {}",
            label,
            path.display()
        )));
    }
    Ok(std::fs::read(path)?)
}
