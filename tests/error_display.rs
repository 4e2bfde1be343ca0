use caliper_lib::{CaliperError, ErrorCategory, ProtocolError};

#[test]
fn config_error_display_includes_message() {
    let err = CaliperError::Config("missing markup".to_string());

    assert_eq!(format!("{}", err), "Configuration error: missing markup");
}

#[test]
fn io_error_display_wraps_source() {
    let io_err = std::io::Error::other("disk full");
    let err: CaliperError = io_err.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("IO error: "));
    assert!(rendered.contains("disk full"));
}

#[test]
fn bad_magic_display_shows_found_value() {
    let err: CaliperError = ProtocolError::BadMagic { found: 0x7b22_6167 }.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("Protocol error: "), "{rendered}");
    assert!(rendered.contains("0x7b226167"), "{rendered}");
}

#[test]
fn truncation_display_names_offset() {
    let err = ProtocolError::UnexpectedEof {
        offset: 40,
        needed: 4,
    };

    assert_eq!(
        format!("{}", err),
        "unexpected end of payload at byte 40 (needed 4 more bytes)"
    );
}

#[test]
fn unknown_errors_map_to_unknown_category() {
    let payload = CaliperError::Unknown("boom".to_string()).to_payload();

    assert_eq!(payload.category, ErrorCategory::Unknown);
    assert_eq!(payload.message, "boom");
    assert!(payload.remediation.is_some());
}
