//! HTTP surface of the relay
//!
//! `POST /orchestrate` hands the message to the configured [`Orchestrator`]
//! and always answers `{ "result": ... }` with 200 unless the dispatch
//! itself fails. Downstream trouble is already folded into the result
//! string by then. Alongside it sit the operational routes:
//!
//! - `GET /health` - service status and the agent URL in use
//! - `GET /live` - liveness probe
//! - `GET /metrics` - request and forward counters
//! - `GET /` - route listing
//!
//! Every non-200 reply uses the `{ "detail": ... }` shape.

pub mod envelope;

pub use envelope::{ErrorEnvelope, InboundRequest, ResponseEnvelope};

use crate::config::RelayConfig;
use crate::error::{error_detail, RelayError, RelayResult};
use crate::observability::metrics::metrics;
use crate::orchestrator::Orchestrator;
use crate::relay_span;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, Instrument};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Relay HTTP server
pub struct RelayServer {
    agent_run_url: String,
    orchestrator: Arc<dyn Orchestrator>,
    started: Instant,
}

impl RelayServer {
    pub fn new(agent_run_url: impl Into<String>, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            agent_run_url: agent_run_url.into(),
            orchestrator,
            started: Instant::now(),
        }
    }

    /// All routes, with rejections rendered as `{ "detail": ... }`
    pub fn routes(
        self: Arc<Self>,
    ) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        let with_server = warp::any().map(move || Arc::clone(&self));

        // POST /orchestrate
        let orchestrate = warp::path("orchestrate")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_server.clone())
            .and_then(
                |request: InboundRequest, server: Arc<RelayServer>| async move {
                    Ok::<_, Infallible>(server.handle_orchestrate(request).await)
                },
            );

        // GET /health
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_server)
            .map(|server: Arc<RelayServer>| warp::reply::json(&server.health_status()));

        // GET /live
        let live = warp::path("live")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| {
                warp::reply::json(&LivenessResponse {
                    alive: true,
                    timestamp: current_timestamp(),
                })
            });

        // GET /metrics
        let metrics_route = warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| warp::reply::json(&metrics().get_metrics()));

        // GET /
        let root = warp::path::end().and(warp::get()).map(|| {
            let mut endpoints = BTreeMap::new();
            endpoints.insert("/orchestrate", "POST a message to the downstream agent");
            endpoints.insert("/health", "Service status and agent URL");
            endpoints.insert("/live", "Liveness probe");
            endpoints.insert("/metrics", "Request and forward counters");
            warp::reply::json(&ApiDocumentationResponse { endpoints })
        });

        orchestrate
            .or(health)
            .or(live)
            .or(metrics_route)
            .or(root)
            .recover(handle_rejection)
    }

    /// Bind `addr` and return the bound address plus the server future
    ///
    /// The future completes once `shutdown` resolves and in-flight
    /// requests have drained.
    pub fn bind<F>(
        self: Arc<Self>,
        addr: SocketAddr,
        shutdown: F,
    ) -> RelayResult<(SocketAddr, impl Future<Output = ()> + 'static)>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .map_err(|source| RelayError::Bind { addr, source })
    }

    /// Run one orchestration in its own task and wrap the outcome
    async fn handle_orchestrate(&self, request: InboundRequest) -> warp::reply::Response {
        let in_flight = metrics().request_received();

        let orchestrator = Arc::clone(&self.orchestrator);
        let span = relay_span!(orchestrator = orchestrator.name());
        info!(parent: &span, topic = %request.message, "Orchestration request received");

        // A panic in the orchestrator stays inside this task
        let message = request.message;
        let outcome = tokio::spawn(
            async move { orchestrator.orchestrate(&message).await }.instrument(span.clone()),
        )
        .await
        .map_err(RelayError::from)
        .and_then(|result| result);

        match outcome {
            Ok(result) => {
                in_flight.completed();
                debug!(parent: &span, result = %result, "Orchestration finished");
                warp::reply::with_status(
                    warp::reply::json(&ResponseEnvelope { result }),
                    StatusCode::OK,
                )
                .into_response()
            }
            Err(e) => {
                in_flight.failed();
                let detail = error_detail(&e);
                error!(parent: &span, error = %e, detail = %detail, "Orchestration failed");
                reply_error(StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        }
    }

    fn health_status(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            agent_run_url: self.agent_run_url.clone(),
            uptime_seconds: self.started.elapsed().as_secs(),
            timestamp: current_timestamp(),
        }
    }
}

/// Bind the configured address and serve until `shutdown` resolves
pub async fn serve<F>(
    config: &RelayConfig,
    orchestrator: Arc<dyn Orchestrator>,
    shutdown: F,
) -> RelayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.listen_addr()?;
    let server = Arc::new(RelayServer::new(config.agent.run_url.clone(), orchestrator));

    let (bound, running) = server.bind(addr, shutdown)?;
    info!(address = %bound, agent_run_url = %config.agent.run_url, "Relay listening");

    running.await;
    info!("Relay server stopped");
    Ok(())
}

async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    if err.is_not_found() {
        return Ok(reply_error(StatusCode::NOT_FOUND, "Not Found"));
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        metrics().request_rejected();
        debug!(error = %e, "Rejected inbound body");
        return Ok(reply_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
    }

    if let Some(e) = err.find::<warp::reject::UnsupportedMediaType>() {
        metrics().request_rejected();
        return Ok(reply_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string()));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(reply_error(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
        ));
    }

    error!(rejection = ?err, "Unhandled rejection");
    Ok(reply_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Unhandled rejection: {err:?}"),
    ))
}

fn reply_error(status: StatusCode, detail: impl Into<String>) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&ErrorEnvelope::new(detail)), status)
        .into_response()
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: String,
    service: String,
    agent_run_url: String,
    uptime_seconds: u64,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct ApiDocumentationResponse {
    endpoints: BTreeMap<&'static str, &'static str>,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
