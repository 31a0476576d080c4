//! Tests for the relay's span macros
//!
//! Format and level parsing are covered next to the code in
//! `observability::logging`; these check what the exported macros build.

use tracing::Level;

fn with_subscriber<T>(f: impl FnOnce() -> T) -> T {
    tracing::subscriber::with_default(tracing_subscriber::registry(), f)
}

#[test]
fn test_relay_span_name_and_fields() {
    with_subscriber(|| {
        let span = agent_relay::relay_span!(orchestrator = "agent_forwarder");
        let metadata = span.metadata().expect("span should be enabled");

        assert_eq!(metadata.name(), "relay_request");
        assert_eq!(*metadata.level(), Level::INFO);
        assert!(metadata.fields().field("orchestrator").is_some());
    });
}

#[test]
fn test_forward_span_name_and_fields() {
    with_subscriber(|| {
        let span = agent_relay::forward_span!(url = "http://localhost:8000/run");
        let metadata = span.metadata().expect("span should be enabled");

        assert_eq!(metadata.name(), "agent_forward");
        assert_eq!(*metadata.level(), Level::INFO);
        assert!(metadata.fields().field("url").is_some());
    });
}
