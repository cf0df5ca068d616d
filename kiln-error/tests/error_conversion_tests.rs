//! Tests for error kind conversions and categories

use kiln_error::{
    codes, kinds, Error, ErrorCategory, LinkError, ParseError, ToErrorCategory, Trap, TrapCode,
    ValidationError,
};

#[test]
fn test_error_from_validation_error() {
    let error: Error = ValidationError("test validation error".into()).into();

    assert_eq!(error.category, ErrorCategory::Validation);
    assert_eq!(error.code, codes::VALIDATION_ERROR);
    assert_eq!(error.message(), "test validation error");
}

#[test]
fn test_error_from_parse_error() {
    let error: Error = ParseError("bad magic".into()).into();

    assert_eq!(error.category, ErrorCategory::Parse);
    assert!(error.is_decode());
}

#[test]
fn test_error_from_link_error() {
    let error: Error = LinkError("unknown import".into()).into();
    assert!(error.is_link());
    assert_eq!(error.to_category(), ErrorCategory::Link);
}

#[test]
fn test_constructor_helpers() {
    assert_eq!(kinds::type_error("x").category, ErrorCategory::Type);
    assert_eq!(kinds::resource_error("x").category, ErrorCategory::Resource);
    assert_eq!(kinds::not_found_error("x").code, codes::EXPORT_NOT_FOUND);
    assert_eq!(kinds::runtime_error("x").category, ErrorCategory::Runtime);
}

#[test]
fn test_trap_keeps_host_error() {
    let err: Error = Trap::host(Error::host("host failed")).into();

    assert_eq!(err.trap_code(), Some(TrapCode::HostError));
    let trap = err.trap().expect("trap payload");
    assert_eq!(trap.host_error().map(Error::message), Some("host failed"));
    assert!(err.to_string().contains("host failed"));
}

#[test]
fn test_location_is_not_part_of_message() {
    let err = kinds::validation_error("type mismatch")
        .with_func_index(7)
        .with_offset(100);
    assert_eq!(err.message(), "type mismatch");
    assert_eq!(err.func_index(), Some(7));
    assert_eq!(err.offset(), Some(100));
}
