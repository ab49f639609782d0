//! Parsing of delimited JSON bodies and extraction of the prompt text.

use std::borrow::Cow;

use serde_json::Value;

use crate::error_handling::types::CaptureError;

/// Decodes a body as UTF-8, falling back to lossy replacement.
///
/// The error is returned alongside the text so callers can report it without
/// giving up on the payload.
pub fn decode_body(body: &[u8]) -> (Cow<'_, str>, Option<CaptureError>) {
    match std::str::from_utf8(body) {
        Ok(text) => (Cow::Borrowed(text), None),
        Err(e) => (String::from_utf8_lossy(body), Some(e.into())),
    }
}

/// Parses a JSON body into a generic value.
pub fn parse(json_text: &str) -> Result<Value, CaptureError> {
    Ok(serde_json::from_str(json_text)?)
}

/// Reads `contents[0].parts[0].text`.
///
/// Absence at any step is the common case for payloads that are not chat
/// requests and yields `None`; so does a non-string or empty `text`.
pub fn extract_prompt_text(value: &Value) -> Option<&str> {
    locate_prompt_text(value).ok().filter(|text| !text.is_empty())
}

/// Like [`extract_prompt_text`] but names the missing step, for diagnostics.
pub fn locate_prompt_text(value: &Value) -> Result<&str, CaptureError> {
    let steps: [(&str, fn(&Value) -> Option<&Value>); 5] = [
        ("contents", |v| v.get("contents")),
        ("contents[0]", |v| v.get(0)),
        ("contents[0].parts", |v| v.get("parts")),
        ("contents[0].parts[0]", |v| v.get(0)),
        ("contents[0].parts[0].text", |v| v.get("text")),
    ];

    let mut current = value;
    for (path, step) in steps {
        current = step(current).ok_or_else(|| CaptureError::ShapeMismatch {
            path: path.to_string(),
        })?;
    }
    current.as_str().ok_or_else(|| CaptureError::ShapeMismatch {
        path: "contents[0].parts[0].text".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_text() {
        let value = parse(r#"{"contents":[{"parts":[{"text":"hello"}]}]}"#).unwrap();
        assert_eq!(extract_prompt_text(&value), Some("hello"));
        assert_eq!(locate_prompt_text(&value).unwrap(), "hello");
    }

    #[test]
    fn other_shape_is_none_not_error() {
        let value = parse(r#"{"other":1}"#).unwrap();
        assert_eq!(extract_prompt_text(&value), None);
        match locate_prompt_text(&value) {
            Err(CaptureError::ShapeMismatch { path }) => assert_eq!(path, "contents"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_sequences_are_none() {
        let value = parse(r#"{"contents":[]}"#).unwrap();
        assert_eq!(extract_prompt_text(&value), None);
        let value = parse(r#"{"contents":[{"parts":[]}]}"#).unwrap();
        match locate_prompt_text(&value) {
            Err(CaptureError::ShapeMismatch { path }) => assert_eq!(path, "contents[0].parts[0]"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_text_is_none() {
        let value = parse(r#"{"contents":[{"parts":[{"text":""}]}]}"#).unwrap();
        assert_eq!(extract_prompt_text(&value), None);
        assert_eq!(locate_prompt_text(&value).unwrap(), "");
    }

    #[test]
    fn non_string_text_is_none() {
        let value = parse(r#"{"contents":[{"parts":[{"text":5}]}]}"#).unwrap();
        assert_eq!(extract_prompt_text(&value), None);
    }

    #[test]
    fn malformed_json_is_error() {
        let err = parse(r#"{"a":tru}"#).unwrap_err();
        assert!(matches!(err, CaptureError::MalformedPayload(_)));
    }

    #[test]
    fn decode_body_reports_invalid_utf8() {
        let (text, err) = decode_body(b"{\"t\":\"\xff\"}");
        assert!(text.contains('\u{FFFD}'));
        assert!(matches!(err, Some(CaptureError::DecodeFailure { offset: 6 })));

        let (text, err) = decode_body("{\"t\":\"é\"}".as_bytes());
        assert_eq!(text, "{\"t\":\"é\"}");
        assert!(err.is_none());
    }
}
