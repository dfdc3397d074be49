//! Unit tests for error handling.
//!
//! This module contains tests for error kinds, tips and source decoration.

use crate::errors::errors::{Error, ErrorImpl, ErrorKind, ErrorTip};
use crate::Position;

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        Position::new(1, 4, 1),
    );

    assert_eq!(error.get_error_name(), "ParseError");
    assert_eq!(error.get_kind(), ErrorKind::ParseError);
}

#[test]
fn test_error_position() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "identifier".to_string(),
        },
        Position::new(42, 3, 5),
    );

    assert_eq!(error.get_position().line, 42);
    assert_eq!(error.get_position().col, 3);
}

#[test]
fn test_type_mismatch_error() {
    let error = Error::new(
        ErrorImpl::TypeMatchError {
            name: "a".to_string(),
            expected: "bool".to_string(),
            received: "int".to_string(),
        },
        Position::null(),
    );

    assert_eq!(error.get_error_name(), "TypeError");
    assert_eq!(
        error.to_string(),
        "TypeError: value of type int assigned to `a` which is of type bool"
    );
}

#[test]
fn test_variable_not_declared_error() {
    let error = Error::new(
        ErrorImpl::VariableNotDeclared {
            variable: "foo".to_string(),
        },
        Position::null(),
    );

    assert_eq!(error.get_error_name(), "SymbolLookupError");
    assert!(matches!(error.get_tip(), ErrorTip::Suggestion(_)));
}

#[test]
fn test_kinds_of_each_family() {
    let cases = vec![
        (
            ErrorImpl::MemberNotFound {
                class: "C".to_string(),
                member: "x".to_string(),
            },
            ErrorKind::ScopeError,
        ),
        (
            ErrorImpl::ArgumentCountMismatch {
                function: "f".to_string(),
                expected: 1,
                received: 2,
            },
            ErrorKind::ArgumentError,
        ),
        (ErrorImpl::ZeroSliceStep, ErrorKind::ValueError),
        (ErrorImpl::ReturnOutsideFunction, ErrorKind::ScopeError),
        (
            ErrorImpl::MissingReturn {
                function: "f".to_string(),
                expected: "int".to_string(),
            },
            ErrorKind::TypeError,
        ),
        (
            ErrorImpl::InternalError {
                message: "oops".to_string(),
            },
            ErrorKind::InternalError,
        ),
    ];

    for (error_impl, kind) in cases {
        assert_eq!(Error::new(error_impl, Position::null()).get_kind(), kind);
    }
}

#[test]
fn test_no_tip_for_plain_errors() {
    let error = Error::new(ErrorImpl::ZeroSliceStep, Position::null());
    assert!(matches!(error.get_tip(), ErrorTip::None));
    assert_eq!(error.get_tip().to_string(), "");
}

#[test]
fn test_render_underlines_span() {
    let source = "x: int = 1\ny: bool = 12\n";
    let error = Error::new(
        ErrorImpl::TypeMatchError {
            name: "y".to_string(),
            expected: "bool".to_string(),
            received: "int".to_string(),
        },
        Position::new(2, 10, 2),
    );

    let rendered = error.render(source);
    let lines = rendered.lines().collect::<Vec<&str>>();

    assert_eq!(lines[0], "   1| x: int = 1");
    assert_eq!(lines[1], "   2| y: bool = 12");
    assert_eq!(lines[2], "                ^^");
    assert!(lines[3].starts_with("TypeError: "));
}

#[test]
fn test_render_first_line_has_no_previous() {
    let error = Error::new(
        ErrorImpl::VariableNotDeclared {
            variable: "a".to_string(),
        },
        Position::new(1, 0, 1),
    );

    let rendered = error.render("a = 1");
    assert_eq!(rendered.lines().count(), 3);
    assert!(rendered.starts_with("   1| a = 1"));
}

#[test]
fn test_render_without_position() {
    let error = Error::new(ErrorImpl::NoneReceiver, Position::null());
    assert_eq!(error.render("anything"), "ValueError: operation on None");
}
