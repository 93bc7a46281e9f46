//! Fallback JSON recovery for untrusted LLM output (spec §9 "Dynamic JSON
//! from the LLM"): direct parse, regex-extract the array/object, strip
//! markdown code fences, drop trailing commas, then give up.

use serde_json::Value;

/// Recover a JSON array from free-form LLM text.
pub fn parse_json_array(text: &str) -> Option<Vec<Value>> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(items);
    }

    if let Some(slice) = extract_bracketed(text, '[', ']') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&slice) {
            return Some(items);
        }
        let cleaned = strip_code_fences(&slice);
        let cleaned = drop_trailing_commas(&cleaned);
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&cleaned) {
            return Some(items);
        }
    }

    let cleaned = strip_code_fences(text);
    if let Some(slice) = extract_bracketed(&cleaned, '[', ']') {
        let cleaned = drop_trailing_commas(&slice);
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&cleaned) {
            return Some(items);
        }
    }

    let lower = text.to_lowercase();
    if ["nothing important", "no important", "empty array", "[]"]
        .iter()
        .any(|phrase| lower.contains(phrase))
    {
        return Some(Vec::new());
    }

    None
}

/// Recover a single JSON object from free-form LLM text.
pub fn parse_json_object(text: &str) -> Option<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    if let Some(slice) = extract_bracketed(text, '{', '}') {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&slice) {
            return Some(value);
        }
        let cleaned = strip_code_fences(&slice);
        let cleaned = drop_trailing_commas(&cleaned);
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&cleaned) {
            return Some(value);
        }
    }

    let cleaned = strip_code_fences(text);
    if let Some(slice) = extract_bracketed(&cleaned, '{', '}') {
        let cleaned = drop_trailing_commas(&slice);
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&cleaned) {
            return Some(value);
        }
    }

    None
}

fn extract_bracketed(text: &str, open: char, close: char) -> Option<String> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if start >= end {
        return None;
    }
    Some(text[start..=end].to_string())
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Remove commas immediately before a closing `]` or `}`, the single most
/// common malformed-JSON artifact from small local models.
fn drop_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == ']' || chars[j] == '}') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_array_parses() {
        let parsed = parse_json_array(r#"[{"a":1}]"#).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn array_embedded_in_prose_is_extracted() {
        let text = "Sure, here you go:\n[{\"category\":\"fact\",\"content\":\"likes tea\"}]\nhope that helps";
        let parsed = parse_json_array(text).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn markdown_code_fence_is_stripped() {
        let text = "```json\n[{\"a\": 1}]\n```";
        let parsed = parse_json_array(text).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn trailing_comma_is_tolerated() {
        let text = r#"[{"a": 1,}, {"b": 2},]"#;
        let parsed = parse_json_array(text).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn explicit_nothing_phrase_yields_empty_array() {
        let parsed = parse_json_array("Nothing important to remember here.").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn garbage_input_yields_none() {
        assert!(parse_json_array("the quick brown fox").is_none());
    }

    #[test]
    fn object_embedded_in_prose_is_extracted() {
        let text = "Here's the result: {\"action\": \"ADD\", \"title\": \"dentist\",}\nlet me know";
        let parsed = parse_json_object(text).unwrap();
        assert_eq!(parsed["action"], "ADD");
    }

    #[test]
    fn object_direct_parse() {
        let parsed = parse_json_object(r#"{"action": "NOTHING"}"#).unwrap();
        assert_eq!(parsed["action"], "NOTHING");
    }
}
