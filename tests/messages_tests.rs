// Tests for inbound recognition message parsing.

use lecture_bridge::channel::parse_event;

#[test]
fn parses_a_complete_message() {
    let event = parse_event(r#"{"text":"hello world","is_final":true,"confidence":0.93}"#)
        .expect("valid message");
    assert_eq!(event.text, "hello world");
    assert!(event.is_final);
    assert!((event.confidence - 0.93).abs() < f32::EPSILON);
}

#[test]
fn confidence_defaults_to_one_when_absent() {
    let event = parse_event(r#"{"text":"hi","is_final":false}"#).unwrap();
    assert!((event.confidence - 1.0).abs() < f32::EPSILON);
}

#[test]
fn confidence_defaults_to_one_when_null() {
    let event = parse_event(r#"{"text":"hi","is_final":false,"confidence":null}"#).unwrap();
    assert!((event.confidence - 1.0).abs() < f32::EPSILON);
}

#[test]
fn is_final_defaults_to_false() {
    let event = parse_event(r#"{"text":"hi"}"#).unwrap();
    assert!(!event.is_final);
}

#[test]
fn unknown_fields_are_ignored() {
    let event = parse_event(
        r#"{"text":"hi","is_final":true,"confidence":1.0,"channel":0,"model":"nova"}"#,
    )
    .unwrap();
    assert_eq!(event.text, "hi");
}

#[test]
fn malformed_payloads_are_discarded() {
    assert!(parse_event("not json at all").is_none());
    assert!(parse_event("{}").is_none()); // text is required
    assert!(parse_event("42").is_none());
    assert!(parse_event(r#"{"text":17}"#).is_none());
}

#[test]
fn empty_text_still_parses() {
    // Keep-alive style updates are valid messages; the reconciler ignores
    // them downstream.
    let event = parse_event(r#"{"text":"","is_final":false}"#).unwrap();
    assert_eq!(event.text, "");
}
