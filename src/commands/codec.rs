use std::path::{Path, PathBuf};
use std::process::ExitCode;

use caliper_lib::protocol::{deserialize, serialize};
use caliper_lib::{
    CaliperError, CaliperOutput, DecodeOutput, EncodeOutput, RenderedNode,
    CALIPER_OUTPUT_VERSION,
};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};

/// Run the encode command: JSON tree in, binary tree out.
pub fn run_encode(input: PathBuf, output: PathBuf, format: OutputFormat) -> ExitCode {
    let (nodes, bytes) = match encode_file(&input, &output) {
        Ok(counts) => counts,
        Err(err) => return render_error(err, format, None),
    };
    let body = CaliperOutput::Encode(EncodeOutput {
        version: CALIPER_OUTPUT_VERSION.to_string(),
        input,
        output,
        nodes,
        bytes,
    });
    if let Err(err) = write_output(&body, format, None) {
        return render_error(CaliperError::Unknown(err.to_string()), format, None);
    }
    ExitCode::SUCCESS
}

fn encode_file(input: &Path, output: &Path) -> Result<(usize, usize), CaliperError> {
    if !input.exists() {
        return Err(CaliperError::Config(format!(
            "Rendered tree not found: {}",
            input.display()
        )));
    }
    let raw = std::fs::read(input)?;
    let root: RenderedNode = serde_json::from_slice(&raw)?;
    let encoded = serialize(&root)?;
    std::fs::write(output, &encoded)?;
    let nodes = root.walk().len();
    debug!(nodes, json_len = raw.len(), wire_len = encoded.len(), "tree encoded");
    Ok((nodes, encoded.len()))
}

/// Run the decode command: binary tree in, JSON tree out.
pub fn run_decode(input: PathBuf, output: Option<PathBuf>, format: OutputFormat) -> ExitCode {
    let root = match decode_file(&input) {
        Ok(root) => root,
        Err(err) => return render_error(err, format, None),
    };
    let nodes = root.walk().len();

    let tree = match &output {
        Some(path) => {
            let written = serde_json::to_vec_pretty(&root)
                .map_err(CaliperError::from)
                .and_then(|json| std::fs::write(path, json).map_err(CaliperError::from));
            if let Err(err) = written {
                return render_error(err, format, None);
            }
            None
        }
        None => Some(root),
    };

    let body = CaliperOutput::Decode(DecodeOutput {
        version: CALIPER_OUTPUT_VERSION.to_string(),
        input,
        nodes,
        output,
        tree,
    });
    if let Err(err) = write_output(&body, format, None) {
        return render_error(CaliperError::Unknown(err.to_string()), format, None);
    }
    ExitCode::SUCCESS
}

fn decode_file(input: &Path) -> Result<RenderedNode, CaliperError> {
    if !input.exists() {
        return Err(CaliperError::Config(format!(
            "Binary tree not found: {}",
            input.display()
        )));
    }
    let bytes = std::fs::read(input)?;
    Ok(deserialize(&bytes)?)
}
