use clap::Subcommand;
use serde_json::{Value, json};

use crate::util::{api_request, exit_error, parse_json_arg, read_json_from_file};

#[derive(Subcommand)]
pub enum ToolCommands {
    /// List dynamically registered mock tools
    List,
    /// Register or replace a mock tool
    Add {
        /// Tool name
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Input schema as JSON string
        #[arg(long, conflicts_with = "schema_file")]
        input_schema: Option<String>,
        /// Read the input schema from a file ("-" for stdin)
        #[arg(long)]
        schema_file: Option<String>,
        /// Response template, e.g. "Hello {{who}}". Valid JSON is sent as-is.
        #[arg(long)]
        mock_response: Option<String>,
    },
    /// Remove a mock tool
    Remove {
        /// Tool name
        name: String,
    },
}

pub async fn run(api_url: &str, command: ToolCommands) -> i32 {
    match command {
        ToolCommands::List => {
            api_request(api_url, reqwest::Method::GET, "/api/mock-tools", None, &[], &[]).await
        }
        ToolCommands::Add {
            name,
            description,
            input_schema,
            schema_file,
            mock_response,
        } => {
            let schema = match (input_schema, schema_file) {
                (Some(raw), _) => Some(
                    parse_json_arg("--input-schema", &raw).unwrap_or_else(|e| exit_error(&e, None)),
                ),
                (None, Some(path)) => {
                    Some(read_json_from_file(&path).unwrap_or_else(|e| exit_error(&e, None)))
                }
                (None, None) => None,
            };
            let body = add_body(&name, description, schema, mock_response.as_deref());
            api_request(
                api_url,
                reqwest::Method::POST,
                "/api/mock-tools",
                Some(body),
                &[],
                &[],
            )
            .await
        }
        ToolCommands::Remove { name } => {
            let path = format!("/api/mock-tools/{}", encode_segment(&name));
            api_request(api_url, reqwest::Method::DELETE, &path, None, &[], &[]).await
        }
    }
}

/// Omitted fields are left out so the server applies its defaults.
fn add_body(
    name: &str,
    description: Option<String>,
    input_schema: Option<Value>,
    mock_response: Option<&str>,
) -> Value {
    let mut body = json!({ "name": name });
    if let Some(description) = description {
        body["description"] = json!(description);
    }
    if let Some(schema) = input_schema {
        body["input_schema"] = schema;
    }
    if let Some(raw) = mock_response {
        body["mock_response"] = parse_mock_response(raw);
    }
    body
}

/// JSON objects and arrays pass through; anything else is a text template.
fn parse_mock_response(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

fn encode_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_response_text_stays_a_template() {
        assert_eq!(parse_mock_response("Hello {{who}}"), json!("Hello {{who}}"));
        assert_eq!(parse_mock_response("42"), json!("42"));
        assert_eq!(
            parse_mock_response(r#"{"text": "{{q}}"}"#),
            json!({"text": "{{q}}"})
        );
    }

    #[test]
    fn add_body_omits_unset_fields() {
        assert_eq!(add_body("greet", None, None, None), json!({"name": "greet"}));
        let body = add_body(
            "greet",
            Some("Says hi".to_string()),
            Some(json!({"type": "object"})),
            Some("Hi {{who}}"),
        );
        assert_eq!(body["description"], json!("Says hi"));
        assert_eq!(body["input_schema"], json!({"type": "object"}));
        assert_eq!(body["mock_response"], json!("Hi {{who}}"));
    }

    #[test]
    fn names_are_percent_encoded_in_paths() {
        assert_eq!(encode_segment("get_weather"), "get_weather");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }
}
