//! Agent Relay
//!
//! A thin HTTP relay in front of a downstream agent service. It accepts
//! `{ "message": ... }` on `POST /orchestrate`, forwards it to the agent as
//! `{ "topic": ..., "current_year": ... }`, and answers `{ "result": ... }`.
//!
//! # Overview
//!
//! - [`server`] - the warp routes and the serve loop
//! - [`forwarder`] - the outbound call and its result classification
//! - [`orchestrator`] - the seam between the two
//! - [`config`] - TOML file plus environment overrides
//! - [`observability`] - tracing setup and relay counters
//!
//! # Quick Start
//!
//! ```no_run
//! use agent_relay::{forwarder::AgentForwarder, server, RelayConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::from_env()?;
//! let forwarder = Arc::new(AgentForwarder::new(config.agent.run_url.clone()));
//!
//! server::serve(&config, forwarder, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Downstream failures never surface as HTTP errors. They come back as
//! result strings:
//!
//! ```
//! use agent_relay::error::ForwardError;
//!
//! let error = ForwardError::agent("HTTP status client error (404 Not Found)");
//! assert!(error.to_string().starts_with("Error al llamar al agente:"));
//! ```

pub mod config;
pub mod error;
pub mod forwarder;
pub mod observability;
pub mod orchestrator;
pub mod server;
pub mod testing;

pub use config::{ConfigError, RelayConfig};
pub use error::{ForwardError, RelayError, RelayResult};
pub use forwarder::{AgentForwarder, Clock, OutboundPayload, SystemClock};
pub use orchestrator::Orchestrator;
pub use server::{ErrorEnvelope, InboundRequest, RelayServer, ResponseEnvelope};
