use serde_json::{Map, Value};

/// Replaces every literal `{{key}}` in `template` with the string form of `arguments[key]`.
///
/// Keys are applied one after another with no escaping and no re-scan guard, so a
/// substituted value that itself contains `{{other}}` may be replaced by a later key.
pub fn substitute(template: &str, arguments: &Map<String, Value>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in arguments {
        let placeholder = format!("{{{{{key}}}}}");
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, &value_to_text(value));
        }
    }
    rendered
}

/// Text for a `tools/call` result: templates are rendered, structured values serialized as-is.
pub fn render_mock_response(mock_response: &Value, arguments: &Map<String, Value>) -> String {
    match mock_response {
        Value::String(template) => substitute(template, arguments),
        other => other.to_string(),
    }
}

/// Strings are inserted raw; everything else as compact JSON.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
