use serde_json::Value;

use crate::frame::Frame;

/// Field holding the original text when a payload is not valid JSON.
pub const RAW_FIELD: &str = "raw";

/// A frame whose payload has been interpreted.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecodedEvent {
    pub event: String,
    pub data: Value,
}

impl DecodedEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Original payload text when it did not parse as JSON.
    pub fn raw_text(&self) -> Option<&str> {
        let obj = self.data.as_object()?;
        if obj.len() != 1 {
            return None;
        }
        obj.get(RAW_FIELD).and_then(Value::as_str)
    }
}

impl From<Frame> for DecodedEvent {
    fn from(frame: Frame) -> Self {
        Self {
            data: decode_payload(&frame.data),
            event: frame.event,
        }
    }
}

/// Parses a payload as JSON, falling back to `{"raw": text}`.
///
/// Never fails, so one malformed frame cannot abort a stream.
pub fn decode_payload(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            let mut record = serde_json::Map::new();
            record.insert(RAW_FIELD.to_string(), Value::String(text.to_string()));
            Value::Object(record)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_is_kept() {
        let value = decode_payload(r#"{"duration_ms":120}"#);
        assert_eq!(value["duration_ms"], 120);
    }

    #[test]
    fn json_scalars_are_structured_values() {
        assert_eq!(decode_payload("42"), serde_json::json!(42));
        assert_eq!(decode_payload("\"s\""), serde_json::json!("s"));
    }

    #[test]
    fn invalid_json_falls_back_to_raw_record() {
        let event = DecodedEvent::from(Frame::new("message", "{not json"));
        assert_eq!(event.data, serde_json::json!({"raw": "{not json"}));
        assert_eq!(event.raw_text(), Some("{not json"));
        assert_eq!(event.event, "message");
    }

    #[test]
    fn empty_payload_is_raw() {
        assert_eq!(decode_payload(""), serde_json::json!({"raw": ""}));
    }

    #[test]
    fn structured_payload_has_no_raw_text() {
        let event = DecodedEvent::from(Frame::new("x", r#"{"raw":"a","b":1}"#));
        assert!(event.raw_text().is_none());
    }
}
