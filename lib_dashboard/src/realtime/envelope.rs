//! Wire format of the notification channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message on the notification channel.
///
/// UTF-8 JSON text with exactly two top-level fields: `type` names the event
/// kind and `data` is an opaque payload whose schema the backend defines per
/// kind. A missing `data` field decodes as JSON null rather than failing the
/// whole envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "data", default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Decodes a raw text frame. Errors here are the caller's cue to log and
    /// discard; they must never tear down the connection.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_type_and_data() {
        let env = Envelope::decode(r#"{"type":"analysis_progress","data":{"project_id":7}}"#)
            .expect("well-formed envelope");
        assert_eq!(env.kind, "analysis_progress");
        assert_eq!(env.payload, json!({"project_id": 7}));
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let env = Envelope::decode(r#"{"type":"ping"}"#).expect("data is optional");
        assert_eq!(env.kind, "ping");
        assert!(env.payload.is_null());
    }

    #[test]
    fn rejects_frames_without_a_type() {
        assert!(Envelope::decode(r#"{"data":{}}"#).is_err());
        assert!(Envelope::decode("not json at all").is_err());
    }

    #[test]
    fn round_trips_field_names() {
        let env = Envelope::new("ground_truth_added", json!({"file_path": "a.java"}));
        let raw = env.encode().unwrap();
        assert!(raw.contains(r#""type":"ground_truth_added""#));
        assert!(raw.contains(r#""data""#));
    }
}
