use serde_json::Value;

use super::AgentError;

/// The status envelope every agent prompt asks the model to answer with:
///
/// ```json
/// { "status": 1, "message": "...", "<payload>": ... }
/// ```
///
/// `1` carries a payload, `0` means nothing suitable was found and `-1` means
/// the model gave up.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    Ok(Value),
    Empty(String),
    Error(String),
}

impl AgentReply {
    /// Finds the envelope inside free-form model output and reads `payload_key`
    /// out of it on success.
    pub fn decode(text: &str, payload_key: &str) -> Result<Self, AgentError> {
        let json = extract_json(text)
            .ok_or_else(|| AgentError::MalformedReply("no JSON object in reply".into()))?;

        // Some models wrap the envelope in a list.
        let envelope = match json {
            Value::Array(items) => items
                .into_iter()
                .find(Value::is_object)
                .ok_or_else(|| AgentError::MalformedReply("JSON list without an object".into()))?,
            other => other,
        };

        let status = envelope
            .get("status")
            .and_then(status_code)
            .ok_or_else(|| AgentError::MalformedReply("missing status".into()))?;
        let message = envelope
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match status {
            1 => Ok(AgentReply::Ok(
                envelope.get(payload_key).cloned().unwrap_or(Value::Null),
            )),
            0 => Ok(AgentReply::Empty(message)),
            -1 => Ok(AgentReply::Error(message)),
            other => Err(AgentError::MalformedReply(format!("unknown status {other}"))),
        }
    }
}

fn status_code(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// First JSON object, or list holding an object, embedded in `text`. Code
/// fences and chatter around the JSON are skipped.
pub fn extract_json(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| matches!(c, '{' | '['))
        .find_map(|(start, _)| {
            let mut stream =
                serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) if holds_object(&value) => Some(value),
                _ => None,
            }
        })
}

fn holds_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(Value::is_object),
        _ => false,
    }
}
