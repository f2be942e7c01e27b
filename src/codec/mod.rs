//! Type-directed sanitizing of request input and escaping of response output.
//!
//! `escape(sanitize(x, kind), kind)` gives back `x` for values the kind can represent,
//! up to whitespace and HTML entity normalization on the text kinds.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Field kind tags accepted by `sanitize` and `escape`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Text,
    Select,
    Date,
    Textarea,
    Content,
    Checkbox,
    Radio,
    Url,
    File,
    Number,
    Array,
}

impl FieldKind {
    /// Unknown tags fall back to plain text
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "title" => FieldKind::Title,
            "select" => FieldKind::Select,
            "date" => FieldKind::Date,
            "textarea" => FieldKind::Textarea,
            "content" => FieldKind::Content,
            "checkbox" => FieldKind::Checkbox,
            "radio" => FieldKind::Radio,
            "url" => FieldKind::Url,
            "file" => FieldKind::File,
            "number" => FieldKind::Number,
            "array" => FieldKind::Array,
            _ => FieldKind::Text,
        }
    }
}

const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "strong", "i", "em", "p", "br", "ul", "ol", "li", "blockquote", "code",
];

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid script regex")
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)([^>]*?)(/?)>").expect("valid element regex")
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(href|title)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attribute regex")
});
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);").expect("valid entity regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\x00-\x1f]+").expect("valid whitespace regex"));

/// Turn caller input into a storage-safe value
pub fn sanitize(value: &Value, kind: FieldKind) -> Value {
    match kind {
        FieldKind::Title | FieldKind::Text | FieldKind::Select | FieldKind::Date => {
            Value::String(sanitize_text(&scalar_string(value)))
        }
        FieldKind::Textarea | FieldKind::Content => Value::String(filter_rich_text(&scalar_string(value))),
        FieldKind::Checkbox | FieldKind::Radio => Value::Bool(truthy(value)),
        FieldKind::Url => Value::String(sanitize_url(&scalar_string(value))),
        FieldKind::File | FieldKind::Number => Value::from(absint(value)),
        FieldKind::Array => Value::String(serialize(value)),
    }
}

/// Turn a stored value into its response form
pub fn escape(value: &Value, kind: FieldKind) -> Value {
    match kind {
        FieldKind::Title | FieldKind::Text | FieldKind::Select | FieldKind::Date => match value {
            Value::String(s) => Value::String(escape_html(s)),
            Value::Null => Value::String(String::new()),
            other => other.clone(),
        },
        FieldKind::Textarea | FieldKind::Content => Value::String(filter_rich_text(&scalar_string(value))),
        FieldKind::Checkbox | FieldKind::Radio => Value::Bool(truthy(value)),
        FieldKind::Url => Value::String(escape_url(&scalar_string(value))),
        FieldKind::File | FieldKind::Number => Value::from(absint(value)),
        FieldKind::Array => unserialize(value),
    }
}

/// Escape the listed fields of a row in place; other fields are left alone
pub fn escape_row(row: &mut Map<String, Value>, fields: &[(&str, FieldKind)]) {
    for (name, kind) in fields {
        if let Some(value) = row.get_mut(*name) {
            *value = escape(value, *kind);
        }
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        // Structured values have no plain-text form
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn sanitize_text(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    let stripped = ANY_TAG.replace_all(&without_scripts, "");
    let stripped = stripped.replace('<', "&lt;");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Keep the small rich-text subset, dropping every other tag and attribute
fn filter_rich_text(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    TAG.replace_all(&without_scripts, |caps: &Captures| {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        if !ALLOWED_TAGS.contains(&name.as_str()) {
            return String::new();
        }
        if closing {
            return format!("</{}>", name);
        }
        let self_closing = if caps[4].is_empty() { "" } else { " /" };
        if name != "a" {
            return format!("<{}{}>", name, self_closing);
        }
        let mut attributes = String::new();
        for attr in ATTRIBUTE.captures_iter(&caps[3]) {
            let attr_name = attr[1].to_ascii_lowercase();
            let attr_value = attr.get(2).or_else(|| attr.get(3)).map_or("", |m| m.as_str());
            if attr_name == "href" && !is_safe_href(attr_value) {
                continue;
            }
            attributes.push_str(&format!(" {}=\"{}\"", attr_name, attr_value.replace('"', "&quot;")));
        }
        format!("<a{}>", attributes)
    })
    .into_owned()
}

fn is_safe_href(href: &str) -> bool {
    let lowered = href.trim().to_ascii_lowercase();
    !(lowered.starts_with("javascript:") || lowered.starts_with("data:") || lowered.starts_with("vbscript:"))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Absolute integer value; leading digits of a string count, anything else is 0
fn absint(value: &Value) -> i64 {
    let n = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)).unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => leading_int(s),
        _ => 0,
    };
    n.checked_abs().unwrap_or(i64::MAX)
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

fn sanitize_url(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace() && !matches!(c, '"' | '<' | '>' | '\\'))
        .collect();
    match url::Url::parse(&cleaned) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https" | "mailto") => cleaned,
        _ => String::new(),
    }
}

fn escape_url(input: &str) -> String {
    sanitize_url(input).replace('&', "&#038;").replace('\'', "&#039;")
}

/// Existing entities are kept as they are, so escaping never double-encodes
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, c) in input.char_indices() {
        match c {
            '&' if ENTITY.is_match(&input[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Already-serialized strings are stored as they are
fn serialize(value: &Value) -> String {
    if let Value::String(s) = value {
        if let Ok(parsed @ (Value::Array(_) | Value::Object(_))) = serde_json::from_str::<Value>(s) {
            return parsed.to_string();
        }
    }
    value.to_string()
}

/// Strings that are not serialized data come back unchanged
fn unserialize(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(value: Value, kind: FieldKind) -> Value {
        escape(&sanitize(&value, kind), kind)
    }

    #[test]
    fn round_trips_plain_strings() {
        for kind in [FieldKind::Title, FieldKind::Text, FieldKind::Select] {
            assert_eq!(round_trip(json!("Launch plan"), kind), json!("Launch plan"));
        }
    }

    #[test]
    fn entities_are_not_encoded_twice() {
        assert_eq!(round_trip(json!("a < b"), FieldKind::Title), json!("a &lt; b"));
        assert_eq!(round_trip(json!("Tom &amp; Jerry"), FieldKind::Title), json!("Tom &amp; Jerry"));
        assert_eq!(round_trip(json!("Tom & Jerry"), FieldKind::Text), json!("Tom &amp; Jerry"));
        assert_eq!(escape(&json!("&#039;q&#x27; &copy;"), FieldKind::Text), json!("&#039;q&#x27; &copy;"));
        assert_eq!(escape(&json!("fish &chips; & more"), FieldKind::Text), json!("fish &chips; &amp; more"));
    }

    #[test]
    fn round_trips_allowed_rich_text() {
        let html = json!("<p>Ship it <strong>now</strong><br /><a href=\"https://example.com\" title=\"docs\">docs</a></p>");
        assert_eq!(round_trip(html.clone(), FieldKind::Textarea), html);
    }

    #[test]
    fn round_trips_nested_arrays() {
        let nested = json!([1, [2, 3], {"a": ["x", "y"]}, "z"]);
        assert_eq!(round_trip(nested.clone(), FieldKind::Array), nested);
        let access = json!({"global": false, "global_id": 12});
        assert_eq!(round_trip(access.clone(), FieldKind::Array), access);
    }

    #[test]
    fn round_trips_booleans() {
        assert_eq!(round_trip(json!(true), FieldKind::Checkbox), json!(true));
        assert_eq!(round_trip(json!(false), FieldKind::Radio), json!(false));
    }

    #[test]
    fn text_strips_tags_and_collapses_whitespace() {
        let dirty = json!("  <b>Hello</b>\n\t world <script>alert(1)</script> ");
        assert_eq!(sanitize(&dirty, FieldKind::Text), json!("Hello world"));
        assert_eq!(escape(&json!("Tom & \"Jerry\""), FieldKind::Text), json!("Tom &amp; &quot;Jerry&quot;"));
    }

    #[test]
    fn rich_text_drops_disallowed_markup() {
        let dirty = json!("<div onclick=\"x()\"><p class=\"c\">Hi</p><img src=x><a href=\"javascript:alert(1)\">bad</a></div>");
        assert_eq!(sanitize(&dirty, FieldKind::Textarea), json!("<p>Hi</p><a>bad</a>"));
    }

    #[test]
    fn numbers_are_absolute_integers() {
        assert_eq!(sanitize(&json!(-5), FieldKind::Number), json!(5));
        assert_eq!(sanitize(&json!("12abc"), FieldKind::Number), json!(12));
        assert_eq!(sanitize(&json!("abc"), FieldKind::File), json!(0));
        assert_eq!(sanitize(&json!(7.9), FieldKind::Number), json!(7));
    }

    #[test]
    fn checkbox_accepts_truthy_strings() {
        assert_eq!(sanitize(&json!("on"), FieldKind::Checkbox), json!(true));
        assert_eq!(sanitize(&json!("0"), FieldKind::Checkbox), json!(false));
        assert_eq!(sanitize(&json!(1), FieldKind::Checkbox), json!(true));
    }

    #[test]
    fn urls_need_a_web_scheme() {
        assert_eq!(sanitize(&json!(" https://example.com/a?b=1 "), FieldKind::Url), json!("https://example.com/a?b=1"));
        assert_eq!(sanitize(&json!("javascript:alert(1)"), FieldKind::Url), json!(""));
        assert_eq!(escape(&json!("https://example.com/?a=1&b=2"), FieldKind::Url), json!("https://example.com/?a=1&#038;b=2"));
    }

    #[test]
    fn array_keeps_already_serialized_input() {
        assert_eq!(sanitize(&json!("[1,2]"), FieldKind::Array), json!("[1,2]"));
        assert_eq!(escape(&json!("not serialized"), FieldKind::Array), json!("not serialized"));
    }

    #[test]
    fn unknown_tags_are_text() {
        assert_eq!(FieldKind::parse("wysiwyg"), FieldKind::Text);
        assert_eq!(FieldKind::parse("TEXTAREA"), FieldKind::Textarea);
    }

    #[test]
    fn escapes_only_listed_row_fields() {
        let mut row = json!({"title": "a<b", "tasks": "[1]", "position": 3}).as_object().cloned().unwrap();
        escape_row(&mut row, &[("title", FieldKind::Title), ("tasks", FieldKind::Array)]);
        assert_eq!(row["title"], "a&lt;b");
        assert_eq!(row["tasks"], json!([1]));
        assert_eq!(row["position"], 3);
    }
}
