//! Integration tests for parse error reporting.

use std::error::Error;

use slirc_proto::{Message, MessageParseError, ProtocolError};

#[test]
fn test_invalid_lines_are_rejected_with_context() {
    let cases = ["", "   ", ":nick!u@h", "!!! x", "12 x", "PRIVMSG#x"];

    for line in cases {
        let err = line
            .parse::<Message>()
            .expect_err(&format!("{line:?} should not parse"));
        let ProtocolError::InvalidMessage { string, .. } = &err else {
            panic!("unexpected error kind for {line:?}: {err:?}");
        };
        assert_eq!(string, line);
        assert!(err.source().is_some(), "{line:?} should carry a cause");
    }
}

#[test]
fn test_missing_parameter_is_an_error() {
    let msg: Message = "JOIN".parse().unwrap();
    let err = msg.param(0).unwrap_err();
    assert_eq!(
        err,
        MessageParseError::MissingParameter {
            command: "JOIN".into(),
            index: 0,
            len: 0,
        }
    );
    assert_eq!(err.to_string(), "JOIN has no parameter at index 0 (got 0)");
}

#[test]
fn test_odd_but_valid_lines_parse() {
    let msg: Message = "  PING   :  spaced".parse().unwrap();
    assert_eq!(msg.params, vec!["  spaced"]);

    let msg: Message = "@a=b;c :srv NOTICE * :*** hi".parse().unwrap();
    assert_eq!(msg.sender_nick(), Some("srv"));
    assert_eq!(msg.params, vec!["*", "*** hi"]);
}
