//! Recovery of JSON payloads from freeform model replies.
//!
//! A generative model asked to "return JSON" may still wrap its answer in prose
//! or Markdown fences. Everything here degrades to an empty result instead of
//! failing, except [`extract_json_object`] callers that need exactly one record.

use std::borrow::Cow;
use std::sync::OnceLock;

use pa_core::ExtractedNewsItem;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z]*[ \t]*\r?\n?").expect("valid fence pattern"))
}

/// Removes Markdown code-fence markers, keeping the fenced content.
pub fn strip_code_fences(text: &str) -> Cow<'_, str> {
    fence_regex().replace_all(text, "")
}

/// Pairs every `open` with its matching `close` in one pass, sorted by the
/// opening offset. Brackets inside string literals are ignored; quotes only
/// count once a bracket is open, so prose around the payload cannot flip the
/// string state. Brackets that never close get no pair.
fn bracket_pairs(bytes: &[u8], open: u8, close: u8) -> Vec<(usize, usize)> {
    let mut stack: Vec<usize> = Vec::new();
    let mut pairs = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' if !stack.is_empty() => in_string = true,
            _ if b == open => stack.push(i),
            _ if b == close => {
                if let Some(begin) = stack.pop() {
                    pairs.push((begin, i));
                }
            }
            _ => {}
        }
    }

    pairs.sort_unstable();
    pairs
}

/// A failed span may still hold a payload when it opens with prose, as in
/// `[see [..]]`. One that opens like a JSON value is broken as a whole.
fn may_wrap_payload(span: &[u8]) -> bool {
    match span[1..].iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b) => !matches!(b, b'{' | b'[' | b'"' | b'-' | b'0'..=b'9'),
        None => false,
    }
}

/// Parses balanced `open..close` spans that are valid JSON, left to right,
/// without overlap. A span that parses is consumed whole, and so is a broken
/// one that opens like a JSON value; only prose-led spans are searched inside.
fn scan_json(text: &str, open: u8, close: u8) -> Vec<Value> {
    let bytes = text.as_bytes();
    let mut values = Vec::new();
    let mut cursor = 0;

    for (begin, end) in bracket_pairs(bytes, open, close) {
        if begin < cursor {
            continue;
        }

        match serde_json::from_str::<Value>(&text[begin..=end]) {
            Ok(value) => {
                values.push(value);
                cursor = end + 1;
            }
            Err(e) => {
                debug!(error = %e, offset = begin, "skipping unparseable JSON candidate");
                if !may_wrap_payload(&bytes[begin..=end]) {
                    cursor = end + 1;
                }
            }
        }
    }
    values
}

/// Finds every JSON array in `text` and returns their elements, concatenated in
/// the order the arrays appear.
pub fn extract_json_arrays(text: &str) -> Vec<Value> {
    let cleaned = strip_code_fences(text);
    scan_json(&cleaned, b'[', b']')
        .into_iter()
        .filter_map(|value| match value {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Returns the first JSON object found in `text`, if any.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let cleaned = strip_code_fences(text);
    scan_json(&cleaned, b'{', b'}')
        .into_iter()
        .find_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extracts news items from a model reply and tags them with `category`.
///
/// Items without a title, summary or url, or whose url does not start with
/// `http`, are dropped.
pub fn parse_news_items(text: &str, category: &str) -> Vec<ExtractedNewsItem> {
    let raw = extract_json_arrays(text);
    let total = raw.len();

    let items: Vec<ExtractedNewsItem> = raw
        .into_iter()
        .filter_map(|value| {
            let object = value.as_object()?;
            let title = string_field(object, "title")?;
            let summary = string_field(object, "summary")?;
            let url = string_field(object, "url").filter(|u| u.starts_with("http"))?;
            Some(ExtractedNewsItem {
                title,
                summary,
                url,
                published_date: string_field(object, "publishedDate"),
                source_name: string_field(object, "sourceName"),
                category: category.to_string(),
            })
        })
        .collect();

    if items.len() < total {
        debug!(category, kept = items.len(), dropped = total - items.len(), "filtered extracted items");
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_in_prose() {
        let text = "Here is the data:\n```json\n[{\"title\":\"A\",\"summary\":\"B\",\"url\":\"http://x\"}]\n```\nThanks!";
        let items = parse_news_items(text, "tech");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A");
        assert_eq!(items[0].category, "tech");
    }

    #[test]
    fn test_multiple_arrays_are_concatenated() {
        let text = r#"First batch: [{"n": 1}, {"n": 2}] and later [{"n": 3}]."#;
        let values = extract_json_arrays(text);
        assert_eq!(values, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
    }

    #[test]
    fn test_broken_candidate_is_skipped() {
        let text = r#"Broken: [{"n": 1,, }] Good: [{"n": 2}]"#;
        assert_eq!(extract_json_arrays(text), vec![json!({"n": 2})]);
    }

    #[test]
    fn test_array_nested_in_broken_array_is_dropped() {
        let text = r#"Broken: [{"title":"outer","related":[{"title":"inner","summary":"s","url":"https://inner.example"}]}, oops]
Good: [{"title":"good","summary":"s","url":"https://good.example"}]"#;
        let titles: Vec<String> = parse_news_items(text, "tech").into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["good"]);
    }

    #[test]
    fn test_array_inside_prose_brackets() {
        let text = r#"[see [{"n": 1}] for details]"#;
        assert_eq!(extract_json_arrays(text), vec![json!({"n": 1})]);
    }

    #[test]
    fn test_unclosed_brackets_scan_in_linear_time() {
        let started = std::time::Instant::now();
        assert!(extract_json_arrays(&"[".repeat(200_000)).is_empty());
        assert!(extract_json_object(&"{\"a\":".repeat(50_000)).is_none());

        let text = format!("{}[{{\"n\": 1}}]", "[".repeat(200_000));
        assert_eq!(extract_json_arrays(&text), vec![json!({"n": 1})]);

        let prose = format!("{}{}", "[see ".repeat(50_000), "]".repeat(50_000));
        assert!(extract_json_arrays(&prose).is_empty());
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn test_unclosed_bracket_does_not_hide_later_arrays() {
        let text = r#"see note [1 ... and then [{"n": 2}]"#;
        assert_eq!(extract_json_arrays(text), vec![json!({"n": 2})]);
    }

    #[test]
    fn test_brackets_inside_strings() {
        let text = r#"[{"title": "Arrays like [1, 2] and \"quoted ]\" text", "n": 1}] tail ]"#;
        let values = extract_json_arrays(text);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["title"], "Arrays like [1, 2] and \"quoted ]\" text");
    }

    #[test]
    fn test_no_json_is_empty() {
        assert!(extract_json_arrays("Sorry, I could not find any news today.").is_empty());
        assert!(parse_news_items("", "tech").is_empty());
        assert!(extract_json_arrays(r#"{"title": "object only"}"#).is_empty());
    }

    #[test]
    fn test_mandatory_fields() {
        let text = r#"[
            {"title": "ok", "summary": "s", "url": "https://a.example", "publishedDate": "2024-01-02", "sourceName": "Wire"},
            {"title": "", "summary": "s", "url": "https://b.example"},
            {"title": "no summary", "url": "https://c.example"},
            {"title": "ftp", "summary": "s", "url": "ftp://d.example"},
            {"title": "no url", "summary": "s"},
            "not an object"
        ]"#;
        let items = parse_news_items(text, "science");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://a.example");
        assert_eq!(items[0].published_date.as_deref(), Some("2024-01-02"));
        assert_eq!(items[0].source_name.as_deref(), Some("Wire"));
    }

    #[test]
    fn test_extract_json_object() {
        let text = "```json\n{\"question\": \"Why {braces}?\", \"answer\": \"42\"}\n```";
        let object = extract_json_object(text).unwrap();
        assert_eq!(object["question"], "Why {braces}?");
        assert!(extract_json_object("no object here").is_none());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]\n");
        assert_eq!(strip_code_fences("plain"), "plain");
    }
}
