//! Downstream agent forwarder
//!
//! Sends one message to the configured agent endpoint and turns whatever
//! comes back into a result string. Classification:
//!
//! - request could not be sent or completed: `Error en la solicitud HTTP: ...`
//! - any non-2xx status, redirects included: `Error al llamar al agente: ...`
//! - 2xx with a body that is not JSON: `Error al decodificar JSON: ... Contenido: <body>`
//! - 2xx with JSON: the document re-serialized compactly, key order kept
//!
//! None of these are faults from the caller's point of view. The outbound
//! call has no timeout and is never retried.

pub mod clock;
pub mod payload;

pub use clock::{Clock, SystemClock};
pub use payload::OutboundPayload;

use crate::error::{ForwardError, RelayResult};
use crate::forward_span;
use crate::observability::metrics::metrics;
use crate::orchestrator::Orchestrator;
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Outcome label recorded for a successfully forwarded JSON body
pub const FORWARDED: &str = "forwarded";

/// Forwards messages to the downstream agent service
///
/// Waits without bound for the agent to answer. A hung agent holds only
/// the task of the request that reached it.
pub struct AgentForwarder {
    run_url: String,
    clock: Arc<dyn Clock>,
}

impl AgentForwarder {
    /// Forwarder using the local system clock
    pub fn new(run_url: impl Into<String>) -> Self {
        Self::with_clock(run_url, Arc::new(SystemClock))
    }

    pub fn with_clock(run_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            run_url: run_url.into(),
            clock,
        }
    }

    pub fn run_url(&self) -> &str {
        &self.run_url
    }

    /// Build the outbound payload, reading the year from the clock now
    pub fn build_payload(&self, message: &str) -> OutboundPayload {
        OutboundPayload::new(message, self.clock.current_year())
    }

    /// Forward `message` and return the classified result string
    pub async fn forward(&self, message: &str) -> String {
        let span = forward_span!(url = %self.run_url);

        async {
            match self.call_agent(message).await {
                Ok(body) => {
                    metrics().record_forward_outcome(FORWARDED);
                    body
                }
                Err(e) => {
                    metrics().record_forward_outcome(e.kind());
                    warn!(outcome = e.kind(), error = %e, "Agent call did not produce a JSON result");
                    e.to_string()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn call_agent(&self, message: &str) -> Result<String, ForwardError> {
        info!(topic = %message, "Calling agent");

        let payload = self.build_payload(message);
        debug!(topic = %payload.topic, current_year = %payload.current_year, "Built outbound payload");

        // Scoped to this call; dropping it releases the connection on every path.
        // No timeout is configured. Redirects are answers, not hops to follow.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ForwardError::agent(describe(&e)))?;

        let response = client
            .post(&self.run_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ForwardError::transport(describe(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ForwardError::transport(describe(&e)))?;

        info!(status = status.as_u16(), "Agent response received");
        debug!(body = %body, "Agent response body");

        if !status.is_success() {
            return Err(ForwardError::agent(status_details(status, &self.run_url)));
        }

        decode_body(&body)
    }
}

#[async_trait]
impl Orchestrator for AgentForwarder {
    async fn orchestrate(&self, message: &str) -> RelayResult<String> {
        Ok(self.forward(message).await)
    }

    fn name(&self) -> &str {
        "agent_forwarder"
    }
}

/// Parse a 2xx body as JSON and re-serialize it compactly
fn decode_body(body: &str) -> Result<String, ForwardError> {
    let document: Value =
        serde_json::from_str(body).map_err(|e| ForwardError::decode(e.to_string(), body))?;
    debug!("Agent response parsed as JSON");

    serde_json::to_string(&document).map_err(|e| ForwardError::agent(e.to_string()))
}

/// Describe a non-2xx status, e.g. `HTTP status client error (404 Not Found) for url (...)`
fn status_details(status: reqwest::StatusCode, url: &str) -> String {
    let class = if status.is_informational() {
        "informational response"
    } else if status.is_redirection() {
        "redirection"
    } else if status.is_client_error() {
        "client error"
    } else {
        "server error"
    };
    format!("HTTP status {class} ({status}) for url ({url})")
}

/// Render an error with its source chain, `outer: inner: root`
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.contains(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}
