//! Maps decoded chat-completion events to content fragments.

use crate::content::DeltaFragment;
use crate::errors::SkippedEvent;

/// Extracts the fragments carried by one event body.
///
/// Reads `choices[0].delta`. Reasoning text (only when `reasoning_enabled`) is
/// returned before answer text of the same delta. Empty or non-string fields
/// yield nothing, so role announcements come back as `Ok(vec![])`.
pub fn extract_fragments(
    body: &str,
    reasoning_enabled: bool,
) -> Result<Vec<DeltaFragment>, SkippedEvent> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SkippedEvent::MalformedJson(e.to_string()))?;
    extract_from_value(&value, reasoning_enabled)
}

pub(crate) fn extract_from_value(
    value: &serde_json::Value,
    reasoning_enabled: bool,
) -> Result<Vec<DeltaFragment>, SkippedEvent> {
    let Some(delta) = value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .filter(|delta| delta.is_object())
    else {
        return Err(SkippedEvent::UnexpectedShape);
    };

    let mut fragments = Vec::with_capacity(1);
    if reasoning_enabled && let Some(text) = non_empty_str(delta, "reasoning_content") {
        fragments.push(DeltaFragment::reasoning(text));
    }
    if let Some(text) = non_empty_str(delta, "content") {
        fragments.push(DeltaFragment::content(text));
    }
    Ok(fragments)
}

fn non_empty_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FragmentKind;

    #[test]
    fn content_delta_yields_main_fragment() {
        let fragments =
            extract_fragments(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#, false).expect("ok");
        assert_eq!(fragments, vec![DeltaFragment::content("Hi")]);
    }

    #[test]
    fn non_json_body_is_skipped_not_raised() {
        let err = extract_fragments("not-json", true).expect_err("skip");
        assert!(matches!(err, SkippedEvent::MalformedJson(_)));
    }

    #[test]
    fn missing_choices_or_delta_is_unexpected_shape() {
        for body in [
            r#"{"id":"x"}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"index":0}]}"#,
            r#"{"choices":[{"delta":null}]}"#,
            r#"[1,2,3]"#,
        ] {
            assert_eq!(
                extract_fragments(body, false),
                Err(SkippedEvent::UnexpectedShape),
                "{body}"
            );
        }
    }

    #[test]
    fn role_frame_and_empty_content_yield_nothing() {
        let role = r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#;
        assert_eq!(extract_fragments(role, true), Ok(vec![]));
        let null_content = r#"{"choices":[{"delta":{"content":null}}]}"#;
        assert_eq!(extract_fragments(null_content, true), Ok(vec![]));
    }

    #[test]
    fn reasoning_is_dropped_unless_enabled() {
        let body = r#"{"choices":[{"delta":{"reasoning_content":"thinking"}}]}"#;
        assert_eq!(extract_fragments(body, false), Ok(vec![]));
        assert_eq!(
            extract_fragments(body, true),
            Ok(vec![DeltaFragment::reasoning("thinking")])
        );
    }

    #[test]
    fn reasoning_precedes_content_in_the_same_delta() {
        let body = r#"{"choices":[{"delta":{"content":"B","reasoning_content":"A"}}]}"#;
        let kinds: Vec<FragmentKind> = extract_fragments(body, true)
            .expect("ok")
            .into_iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![FragmentKind::ReasoningContent, FragmentKind::MainContent]
        );
    }

    #[test]
    fn only_first_choice_is_read() {
        let body = r#"{"choices":[{"delta":{"content":"one"}},{"delta":{"content":"two"}}]}"#;
        assert_eq!(
            extract_fragments(body, false),
            Ok(vec![DeltaFragment::content("one")])
        );
    }
}
