//! One message carrying a JSON control payload and a binary tree.
//!
//! `json length u32 LE | json bytes | tree bytes`, with nothing between the
//! two payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ProtocolError;

const HEADER_LEN: usize = 4;

/// A decoded envelope. `tree` borrows from the input buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<'a, T> {
    pub message: T,
    pub tree: &'a [u8],
}

/// Prefix `tree` with a length-delimited JSON rendering of `message`.
pub fn encode_envelope<T: Serialize>(message: &T, tree: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(message)?;
    let len = u32::try_from(json.len()).map_err(|_| ProtocolError::CountOverflow {
        what: "envelope byte",
        count: json.len(),
    })?;

    let mut out = Vec::with_capacity(HEADER_LEN + json.len() + tree.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(tree);
    Ok(out)
}

/// Split an envelope into its control message and tree bytes.
pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<Envelope<'_, T>, ProtocolError> {
    let header: [u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or(ProtocolError::EnvelopeTooShort {
            needed: HEADER_LEN,
            available: bytes.len(),
        })?;
    let len = u32::from_le_bytes(header) as usize;
    let rest = &bytes[HEADER_LEN..];
    if rest.len() < len {
        return Err(ProtocolError::EnvelopeTooShort {
            needed: HEADER_LEN + len,
            available: bytes.len(),
        });
    }
    let (json, tree) = rest.split_at(len);
    Ok(Envelope {
        message: serde_json::from_slice(json)?,
        tree,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{deserialize, serialize};
    use crate::types::RenderedNode;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Command {
        action: String,
        seq: u32,
    }

    #[test]
    fn envelope_layout_is_length_then_json_then_tree() {
        let message = Command {
            action: "inspect".into(),
            seq: 7,
        };
        let bytes = encode_envelope(&message, &[1, 2, 3]).expect("encode");
        let json = br#"{"action":"inspect","seq":7}"#;
        assert_eq!(&bytes[..4], &(json.len() as u32).to_le_bytes());
        assert_eq!(&bytes[4..4 + json.len()], json);
        assert_eq!(&bytes[4 + json.len()..], &[1, 2, 3]);
    }

    #[test]
    fn envelope_round_trip_with_tree() {
        let tree = serialize(&RenderedNode::new("n1", "div")).expect("serialize");
        let message = Command {
            action: "reconcile".into(),
            seq: 1,
        };
        let bytes = encode_envelope(&message, &tree).expect("encode");
        let decoded: Envelope<Command> = decode_envelope(&bytes).expect("decode");
        assert_eq!(decoded.message, message);
        assert_eq!(deserialize(decoded.tree).expect("tree").agent_id, "n1");
    }

    #[test]
    fn short_envelopes_are_rejected() {
        assert!(matches!(
            decode_envelope::<Command>(&[1, 0]),
            Err(ProtocolError::EnvelopeTooShort { needed: 4, available: 2 })
        ));
        assert!(matches!(
            decode_envelope::<Command>(&[50, 0, 0, 0, b'{']),
            Err(ProtocolError::EnvelopeTooShort { needed: 54, .. })
        ));
        assert!(matches!(
            decode_envelope::<Command>(&[1, 0, 0, 0, b'{']),
            Err(ProtocolError::Json(_))
        ));
    }
}
