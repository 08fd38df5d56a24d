// src/research/parse.rs — Best-effort JSON extraction from model output
//
// Structured calls promise a schema the model does not always honor. The
// result is a tagged value, never an exception: callers must handle the
// Unparsable branch explicitly.

use std::sync::OnceLock;

use regex::Regex;

use crate::util::truncate_str;

#[derive(Debug, Clone, PartialEq)]
pub enum StructuredResponse {
    Parsed(serde_json::Value),
    Unparsable,
}

impl StructuredResponse {
    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            StructuredResponse::Parsed(v) => Some(v),
            StructuredResponse::Unparsable => None,
        }
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        // Any fence tag counts, not just ```json
        Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\r?\n(?s)(.*?)\r?\n[ \t]*```").expect("valid regex")
    })
}

/// Strict parse of the trimmed text; on failure, the contents of the first
/// fenced code block; on failure, `Unparsable`.
pub fn parse_structured(raw: &str) -> StructuredResponse {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return StructuredResponse::Unparsable;
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return StructuredResponse::Parsed(value);
    }

    if let Some(caps) = fence_regex().captures(raw) {
        if let Ok(value) = serde_json::from_str(caps[1].trim()) {
            return StructuredResponse::Parsed(value);
        }
    }

    tracing::warn!(
        response_preview = truncate_str(raw, 100),
        "failed to parse structured response"
    );
    StructuredResponse::Unparsable
}

/// Tri-state boolean for model verdicts; anything ambiguous stays Unknown
/// and flows as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriBool {
    True,
    False,
    Unknown,
}

impl TriBool {
    /// Normalize a JSON field: real booleans pass through, boolean-like
    /// strings map case-insensitively, everything else is Unknown.
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        match value {
            Some(serde_json::Value::Bool(true)) => TriBool::True,
            Some(serde_json::Value::Bool(false)) => TriBool::False,
            Some(serde_json::Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => TriBool::True,
                "false" | "0" | "no" => TriBool::False,
                _ => TriBool::Unknown,
            },
            _ => TriBool::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        matches!(self, TriBool::True)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_json_parses() {
        let r = parse_structured(r#"{"queries": ["a", "b"]}"#);
        assert_eq!(r, StructuredResponse::Parsed(json!({"queries": ["a", "b"]})));
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let r = parse_structured("  \n {\"finished\": true} \n");
        assert_eq!(r, StructuredResponse::Parsed(json!({"finished": true})));
    }

    #[test]
    fn test_fenced_json_equals_direct_json() {
        let payload = r#"{"relevance": false, "reasoning": "off-topic"}"#;
        let fenced = format!("```json\n{payload}\n```");
        assert_eq!(parse_structured(payload), parse_structured(&fenced));
    }

    #[test]
    fn test_fence_tag_is_irrelevant() {
        let fenced = "```\n{\"x\": 1}\n```";
        assert_eq!(
            parse_structured(fenced),
            StructuredResponse::Parsed(json!({"x": 1}))
        );
    }

    #[test]
    fn test_fenced_block_with_prose_around_it() {
        let text = "Here is the result:\n```json\n{\"x\": 2}\n```\nHope that helps!";
        assert_eq!(
            parse_structured(text),
            StructuredResponse::Parsed(json!({"x": 2}))
        );
    }

    #[test]
    fn test_malformed_is_unparsable() {
        assert_eq!(parse_structured("not json at all"), StructuredResponse::Unparsable);
        assert_eq!(parse_structured("{broken"), StructuredResponse::Unparsable);
        assert_eq!(parse_structured(""), StructuredResponse::Unparsable);
    }

    #[test]
    fn test_malformed_inside_fence_is_unparsable() {
        assert_eq!(
            parse_structured("```json\n{broken\n```"),
            StructuredResponse::Unparsable
        );
    }

    #[test]
    fn test_into_value() {
        assert!(parse_structured("{}").into_value().is_some());
        assert!(parse_structured("nope").into_value().is_none());
    }

    // ─── TriBool normalization ──────────────────────────────────

    #[test]
    fn test_tribool_true_forms() {
        for v in [json!(true), json!("true"), json!("True"), json!("1"), json!("yes")] {
            assert_eq!(TriBool::from_json(Some(&v)), TriBool::True, "value {v}");
        }
    }

    #[test]
    fn test_tribool_false_forms() {
        for v in [json!(false), json!("false"), json!("False"), json!("0"), json!("no")] {
            assert_eq!(TriBool::from_json(Some(&v)), TriBool::False, "value {v}");
        }
    }

    #[test]
    fn test_tribool_unknown_forms() {
        for v in [json!("maybe"), json!(1), json!(null), json!(["true"])] {
            assert_eq!(TriBool::from_json(Some(&v)), TriBool::Unknown, "value {v}");
        }
        assert_eq!(TriBool::from_json(None), TriBool::Unknown);
    }

    #[test]
    fn test_tribool_is_true() {
        assert!(TriBool::True.is_true());
        assert!(!TriBool::False.is_true());
        assert!(!TriBool::Unknown.is_true());
    }
}
