//! Minimal `{{variable}}` templating for stored prompts.
//!
//! Only literal substitution is supported: no sections, no escaping rules and
//! no defaults. Placeholders without a matching argument stay in the output
//! exactly as written.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("static placeholder pattern"));

/// Variable names referenced by `{{...}}` placeholders across all `texts`,
/// in order of first appearance, without duplicates.
pub fn extract_variables<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<String> = Vec::new();
    for text in texts {
        for captures in PLACEHOLDER.captures_iter(text) {
            let Some(name) = captures.get(1) else {
                continue;
            };
            let name = name.as_str().trim();
            if name.is_empty() || seen.iter().any(|existing| existing == name) {
                continue;
            }
            seen.push(name.to_string());
        }
    }
    seen
}

/// Replace every `{{ key }}` occurrence (any inner whitespace) for each key in
/// `args`. Keys are matched literally.
pub fn substitute(text: &str, args: &Map<String, Value>) -> String {
    let mut rendered = text.to_string();
    for (key, value) in args {
        let pattern = format!(r"\{{\{{\s*{}\s*\}}\}}", regex::escape(key));
        let Ok(matcher) = Regex::new(&pattern) else {
            continue;
        };
        let replacement = value_to_text(value);
        rendered = matcher
            .replace_all(&rendered, NoExpand(&replacement))
            .into_owned();
    }
    rendered
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
