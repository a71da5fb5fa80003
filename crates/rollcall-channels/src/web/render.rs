//! Turning HTTP response bodies into reply text.

use regex::Regex;
use serde_json::Value;

/// Keys whose string value is the human-readable reply.
const MESSAGE_KEYS: &[&str] = &["message", "msg", "error"];

/// Render a response body as reply text for the classifier.
///
/// JSON bodies become the message line followed by one `key: value` line
/// per scalar under `data`. Without a message, a `success`/`ok` flag stands
/// in for it as `success` or `request failed`. HTML has its tags stripped. Anything else is
/// passed through trimmed.
pub fn render_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            let mut lines = Vec::new();
            for key in MESSAGE_KEYS {
                if let Some(Value::String(s)) = map.get(*key) {
                    if !s.is_empty() {
                        lines.push(s.clone());
                        break;
                    }
                }
            }
            let flag = ["success", "ok"].iter().find_map(|k| match map.get(*k) {
                Some(Value::Bool(b)) => Some(*b),
                _ => None,
            });
            if lines.is_empty() {
                match flag {
                    Some(true) => lines.push("success".to_string()),
                    Some(false) => lines.push("request failed".to_string()),
                    None => {}
                }
            }
            match map.get("data") {
                Some(Value::Object(data)) => {
                    for (key, value) in data {
                        if let Some(v) = scalar(value) {
                            lines.push(format!("{key}: {v}"));
                        }
                    }
                }
                Some(other) => {
                    if let Some(v) = scalar(other) {
                        lines.push(format!("data: {v}"));
                    }
                }
                None => {}
            }
            if lines.is_empty() {
                body.trim().to_string()
            } else {
                lines.join("\n")
            }
        }
        _ if body.trim_start().starts_with('<') => strip_tags(body),
        _ => body.trim().to_string(),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Drop markup and collapse whitespace, keeping one line per text run.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push('\n');
            }
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find a CSRF token in a page: hidden `_token`/`csrf_token` inputs or a
/// `csrf-token` meta tag.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    const PATTERNS: &[&str] = &[
        r#"(?i)<input[^>]+name=["'](?:_token|csrf_token|_csrf)["'][^>]*value=["']([^"']+)["']"#,
        r#"(?i)<input[^>]+value=["']([^"']+)["'][^>]*name=["'](?:_token|csrf_token|_csrf)["']"#,
        r#"(?i)<meta[^>]+name=["']csrf-token["'][^>]*content=["']([^"']+)["']"#,
    ];
    PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .find_map(|re| re.captures(html).map(|c| c[1].to_string()))
}
