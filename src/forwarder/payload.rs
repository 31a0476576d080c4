//! Outbound payload sent to the downstream agent

use serde::{Deserialize, Serialize};

/// JSON body of the POST to the agent's run endpoint
///
/// ```json
/// { "topic": "<message>", "current_year": "2025" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundPayload {
    /// The user's message, forwarded verbatim
    pub topic: String,
    /// Four-digit calendar year at call time
    pub current_year: String,
}

impl OutboundPayload {
    pub fn new(topic: impl Into<String>, current_year: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            current_year: current_year.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_wire_shape() {
        let payload = OutboundPayload::new("AI agents", "2025");
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"topic": "AI agents", "current_year": "2025"}));
    }

    #[test]
    fn test_year_serializes_as_string() {
        let payload = OutboundPayload::new("x", "2031");
        let rendered = serde_json::to_string(&payload).unwrap();
        assert!(rendered.contains(r#""current_year":"2031""#));
    }
}
