//! Request and response bodies of the relay's HTTP API

use serde::{Deserialize, Serialize};

/// Body of `POST /orchestrate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundRequest {
    pub message: String,
}

/// Successful reply: `{ "result": "..." }`
///
/// `result` holds either the agent's JSON re-serialized as text or a
/// description of what went wrong downstream. Both arrive with HTTP 200.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub result: String,
}

/// Any non-200 reply: `{ "detail": "..." }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub detail: String,
}

impl ErrorEnvelope {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
