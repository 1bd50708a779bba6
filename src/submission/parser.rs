use serde_json::{Map, Value};

use super::request::SubmissionRequest;

/// Parse a submission body based on the Content-Type header.
pub fn parse_submission(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<SubmissionRequest, String> {
    let value = parse_body(content_type, body)?;
    if !value.is_object() {
        return Err("Expected a JSON object".to_string());
    }
    serde_json::from_value(value).map_err(|e| format!("Invalid submission: {e}"))
}

fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, String> {
    let ct = content_type.unwrap_or("application/json");

    if ct.contains("application/json") {
        serde_json::from_slice(body).map_err(|e| format!("Invalid JSON: {e}"))
    } else if ct.contains("application/x-www-form-urlencoded") {
        parse_form_urlencoded(body)
    } else {
        serde_json::from_slice(body)
            .or_else(|_| parse_form_urlencoded(body))
            .map_err(|e| format!("Unable to parse body: {e}"))
    }
}

fn parse_form_urlencoded(body: &[u8]) -> Result<Value, String> {
    std::str::from_utf8(body).map_err(|e| format!("Invalid UTF-8: {e}"))?;

    let mut map = Map::new();
    for (k, v) in form_urlencoded::parse(body) {
        // Empty form fields mean "not provided"
        if !v.is_empty() {
            map.insert(k.into_owned(), Value::String(v.into_owned()));
        }
    }
    Ok(Value::Object(map))
}
