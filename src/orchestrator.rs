//! Orchestration seam between the relay endpoint and whatever handles a message
//!
//! Production wires in [`crate::forwarder::AgentForwarder`]. An `Err` from
//! [`Orchestrator::orchestrate`] is an internal fault and becomes an HTTP 500;
//! downstream problems are expected to come back as `Ok` result strings.

use crate::error::RelayResult;
use async_trait::async_trait;

#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Handle one inbound message and produce the result string
    async fn orchestrate(&self, message: &str) -> RelayResult<String>;

    /// Name used in logs
    fn name(&self) -> &str;
}
