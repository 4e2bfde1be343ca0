use caliper_lib::protocol::{deserialize, serialize, FORMAT_VERSION, MAGIC, MAX_WIRE_DEPTH};
use caliper_lib::types::BoxRect;
use caliper_lib::{decode_envelope, encode_envelope, Envelope, ProtocolError, RenderedNode};
use serde::{Deserialize, Serialize};

fn nested(depth: usize) -> RenderedNode {
    let level = |d: usize| {
        let mut node = RenderedNode::new(format!("n{d}"), "div");
        node.selector = format!("div:nth-child({d})");
        node.rect = BoxRect::new(d as f32, 0.0, 100.0, 20.0);
        node
    };
    (1..=depth).fold(level(0), |child, d| level(d).with_child(child))
}

fn header(strings: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(MAGIC.to_le_bytes());
    out.extend(FORMAT_VERSION.to_le_bytes());
    out.extend((strings.len() as u32).to_le_bytes());
    for s in strings {
        out.extend((s.len() as u16).to_le_bytes());
        out.extend(s.as_bytes());
    }
    out
}

/// A class-less node record naming dictionary entry `tag` for its tag,
/// selector and agent id.
fn record(tag: u16, child_count: u16) -> Vec<u8> {
    let mut out = Vec::new();
    for index in [tag, tag, tag, 0, 0, 0] {
        out.extend(index.to_le_bytes());
    }
    for _ in 0..8 {
        out.extend(0f32.to_le_bytes());
    }
    for _ in 0..3 {
        out.extend(0u16.to_le_bytes());
    }
    for _ in 0..2 {
        out.extend(f32::NAN.to_le_bytes());
        out.extend(0u16.to_le_bytes());
        out.extend(0u16.to_le_bytes());
    }
    for _ in 0..12 {
        out.extend(0f32.to_le_bytes());
    }
    out.extend(0u16.to_le_bytes());
    out.extend(child_count.to_le_bytes());
    out
}

fn chain(records: usize) -> Vec<u8> {
    let mut out = header(&["div"]);
    for i in 0..records {
        let children = if i + 1 < records { 1 } else { 0 };
        out.extend(record(1, children));
    }
    out
}

#[test]
fn fifty_levels_round_trip_with_parent_links() {
    let tree = nested(50);
    let bytes = serialize(&tree).expect("serialize");
    assert_eq!(&bytes[..4], &MAGIC.to_le_bytes());

    let decoded = deserialize(&bytes).expect("deserialize");
    let original: Vec<_> = tree.walk().into_iter().map(|n| (&n.agent_id, &n.selector, n.rect)).collect();
    let restored: Vec<_> = decoded.walk().into_iter().map(|n| (&n.agent_id, &n.selector, n.rect)).collect();
    assert_eq!(original, restored);

    let leaf = decoded.walk().into_iter().last().expect("leaf");
    assert_eq!(leaf.agent_id, "n0");
    assert_eq!(leaf.parent_agent_id.as_deref(), Some("n1"));
    assert_eq!(leaf.styles.line_height.as_deref(), Some("normal"));
    assert_eq!(leaf.styles.border_radius.as_deref(), Some("0"));
}

#[test]
fn truncated_payloads_fail_cleanly() {
    let bytes = serialize(&nested(3)).expect("serialize");
    for cut in [2, 6, bytes.len() / 2, bytes.len() - 1] {
        let err = deserialize(&bytes[..cut]).expect_err("truncated payload must fail");
        assert!(
            matches!(err, ProtocolError::UnexpectedEof { .. }),
            "cut at {cut}: {err}"
        );
    }
}

#[test]
fn depth_limit_is_enforced_on_both_sides() {
    let at_limit = nested(MAX_WIRE_DEPTH);
    let decoded = deserialize(&serialize(&at_limit).expect("serialize")).expect("deserialize");
    let walked = decoded.walk();
    assert_eq!(walked.len(), MAX_WIRE_DEPTH + 1);
    assert_eq!(walked[MAX_WIRE_DEPTH].agent_id, "n0");

    let too_deep = serialize(&nested(MAX_WIRE_DEPTH + 1)).expect_err("one level past the limit");
    assert!(matches!(too_deep, ProtocolError::DepthExceeded), "{too_deep}");

    assert!(deserialize(&chain(MAX_WIRE_DEPTH + 1)).is_ok());
    let err = deserialize(&chain(MAX_WIRE_DEPTH + 2)).expect_err("one level past the limit");
    assert!(matches!(err, ProtocolError::DepthExceeded), "{err}");
}

#[test]
fn oversized_declared_counts_fail_cleanly() {
    let mut strings = header(&[]);
    strings[6..10].copy_from_slice(&u32::MAX.to_le_bytes());
    let err = deserialize(&strings).expect_err("string count past the payload");
    assert!(matches!(err, ProtocolError::UnexpectedEof { .. }), "{err}");

    let mut classes = header(&["div"]);
    classes.extend(&record(1, 0)[..10]);
    classes.extend(u16::MAX.to_le_bytes());
    classes.extend(1u16.to_le_bytes());
    let err = deserialize(&classes).expect_err("class count past the payload");
    assert!(matches!(err, ProtocolError::UnexpectedEof { .. }), "{err}");

    let mut children = header(&["div"]);
    children.extend(record(1, u16::MAX));
    children.extend(record(1, 0));
    let err = deserialize(&children).expect_err("child count past the payload");
    assert!(matches!(err, ProtocolError::UnexpectedEof { .. }), "{err}");
}

#[test]
fn string_index_past_the_table_is_rejected() {
    let mut bytes = header(&["div"]);
    bytes.extend(record(2, 0));
    let err = deserialize(&bytes).expect_err("index 2 with one entry");
    assert!(
        matches!(err, ProtocolError::StringIndexOutOfRange { index: 2, len: 1 }),
        "{err}"
    );
}

#[test]
fn json_bytes_are_rejected_as_bad_magic() {
    let err = deserialize(br#"{"agentId":"n1","tag":"div"}"#).expect_err("not a wire tree");
    assert!(matches!(err, ProtocolError::BadMagic { .. }));
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectRequest {
    request_id: u32,
    target: String,
}

#[test]
fn envelope_carries_control_message_and_tree() {
    let tree = nested(2);
    let wire = serialize(&tree).expect("serialize");
    let request = InspectRequest {
        request_id: 9,
        target: "#checkout".into(),
    };

    let packed = encode_envelope(&request, &wire).expect("encode envelope");
    let Envelope { message, tree: bytes } =
        decode_envelope::<InspectRequest>(&packed).expect("decode envelope");

    assert_eq!(message, request);
    assert_eq!(bytes, wire.as_slice());
    assert_eq!(deserialize(bytes).expect("tree").walk().len(), 3);
}
