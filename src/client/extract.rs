//! Pulling structured JSON out of free-form model text

use regex::Regex;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```json\s*|```\s*").expect("fence pattern is valid"))
}

fn fenced_block_regex() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("block pattern is valid"))
}

/// Body of the first closed markdown code block, trimmed
pub fn first_fenced_block(text: &str) -> Option<&str> {
    fenced_block_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Remove every markdown code fence marker and trim the result
pub fn strip_code_fences(text: &str) -> String {
    fence_regex().replace_all(text, "").trim().to_string()
}

/// The first balanced `[...]` span, honoring string literals and escapes.
///
/// Returns `None` when there is no `[` or it never closes.
pub fn first_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse model output that should hold JSON.
///
/// A fenced code block that parses wins, so bracketed citations in the
/// surrounding prose are not mistaken for the answer. Otherwise fences are
/// stripped: if a balanced array is found only that span is parsed, else the
/// whole cleaned text must be JSON.
pub fn parse_json_payload(text: &str) -> Result<serde_json::Value, serde_json::Error> {
    if let Some(value) = first_fenced_block(text).and_then(|block| parse_array_or_whole(block).ok()) {
        return Ok(value);
    }
    parse_array_or_whole(&strip_code_fences(text))
}

fn parse_array_or_whole(text: &str) -> Result<serde_json::Value, serde_json::Error> {
    match first_json_array(text) {
        Some(span) => serde_json::from_str(span),
        None => serde_json::from_str(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_first_array_skips_prose() {
        let text = "Here are the results:\n[{\"name\": \"a\"}, {\"name\": \"b\"}]\nHope that helps.";
        assert_eq!(
            first_json_array(text),
            Some("[{\"name\": \"a\"}, {\"name\": \"b\"}]")
        );
    }

    #[test]
    fn test_first_array_nested() {
        assert_eq!(first_json_array("x [[1], [2, [3]]] y [4]"), Some("[[1], [2, [3]]]"));
    }

    #[test]
    fn test_brackets_inside_strings_ignored() {
        let text = r#"[{"note": "closing ] early", "q": "say \"[hi]\""}] tail ]"#;
        assert_eq!(
            first_json_array(text),
            Some(r#"[{"note": "closing ] early", "q": "say \"[hi]\""}]"#)
        );
    }

    #[test]
    fn test_unbalanced_array() {
        assert_eq!(first_json_array("[1, 2"), None);
        assert_eq!(first_json_array("no brackets"), None);
    }

    #[test]
    fn test_parse_payload_array_in_fences() {
        let text = "Sure!\n```json\n[{\"title\": \"Rust\", \"score\": 9}]\n```";
        assert_eq!(
            parse_json_payload(text).unwrap(),
            json!([{"title": "Rust", "score": 9}])
        );
    }

    #[test]
    fn test_parse_payload_object_without_array() {
        let text = "```json\n{\"answer\": 42}\n```";
        assert_eq!(parse_json_payload(text).unwrap(), json!({"answer": 42}));
    }

    #[test]
    fn test_parse_payload_object_containing_array_uses_the_array() {
        let text = "{\"items\": [1, 2, 3]}";
        assert_eq!(parse_json_payload(text).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_first_fenced_block() {
        assert_eq!(first_fenced_block("a\n```json\n[1]\n```\nb ```[2]```"), Some("[1]"));
        assert_eq!(first_fenced_block("```\n{}\n```"), Some("{}"));
        assert_eq!(first_fenced_block("```json\n[1]"), None);
        assert_eq!(first_fenced_block("plain [1]"), None);
    }

    #[test]
    fn test_parse_payload_prefers_fenced_block_over_citation() {
        let text = "Per recent coverage [1], here are the signals:\n```json\n[{\"title\":\"A\"}]\n```";
        assert_eq!(parse_json_payload(text).unwrap(), json!([{"title": "A"}]));
    }

    #[test]
    fn test_parse_payload_unparseable_block_falls_back() {
        let text = "```\nnot json\n```\n[{\"title\": \"B\"}]";
        assert_eq!(parse_json_payload(text).unwrap(), json!([{"title": "B"}]));
    }

    #[test]
    fn test_parse_payload_bad_span_fails() {
        assert!(parse_json_payload("see [citation needed] below").is_err());
        assert!(parse_json_payload("nothing structured").is_err());
        assert!(parse_json_payload("").is_err());
    }
}
