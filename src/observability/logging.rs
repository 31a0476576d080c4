//! Structured logging for the relay
//!
//! Configures a `tracing` subscriber from the environment and provides the
//! span macros used around inbound requests and outbound agent calls.
//!
//! ## Log Format Options
//!
//! The logging system supports three output formats controlled by the `LOG_FORMAT` environment variable:
//!
//! - `json` - Structured JSON format for production and log aggregation systems
//! - `pretty` - Human-readable format with colors and indentation for development
//! - `compact` - Terminal-friendly format with colors but minimal spacing
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: Log level (ERROR, WARN, INFO, DEBUG, TRACE) - defaults to INFO
//! - `LOG_FORMAT`: Output format (json, pretty, compact) - defaults to json
//! - `LOG_SPANS`: Include span events (true/false) - defaults to false
//! - `RUST_LOG`: Override log filtering (follows env_logger format)
//!
//! ## Examples
//!
//! ```bash
//! # Production JSON logging
//! LOG_FORMAT=json LOG_LEVEL=INFO ./agent-relay run
//!
//! # Watch payloads and raw agent bodies during development
//! LOG_FORMAT=pretty LOG_LEVEL=DEBUG ./agent-relay run
//!
//! # Only relay logs, no HTTP stack noise
//! RUST_LOG=agent_relay=debug ./agent-relay run
//! ```

use std::env;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// HTTP stack targets capped at warn
const NOISY_TARGETS: [&str; 4] = ["hyper=warn", "reqwest=warn", "warp=warn", "tokio=warn"];

/// Log output format options
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// JSON format for structured logging (machine-readable)
    Json,
    /// Pretty format with colors and indentation (human-readable)
    Pretty,
    /// Compact format with colors but minimal spacing (terminal-friendly)
    Compact,
}

impl LogFormat {
    /// Parse log format from string
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Json, // Default to JSON for production
        }
    }
}

/// Initialize logging with manual configuration
pub fn init_logging(level: Level, format: LogFormat, include_spans: bool) {
    let mut filter = EnvFilter::new(level.to_string());
    for directive in NOISY_TARGETS {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // RUST_LOG replaces everything above
    if let Ok(rust_log) = env::var("RUST_LOG") {
        filter = EnvFilter::new(rust_log);
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer().json().with_span_events(if include_spans {
                fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
            } else {
                fmt::format::FmtSpan::NONE
            });
            subscriber.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer =
                fmt::layer()
                    .pretty()
                    .with_ansi(true)
                    .with_span_events(if include_spans {
                        fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
                    } else {
                        fmt::format::FmtSpan::NONE
                    });
            subscriber.with(fmt_layer).init();
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_ansi(true)
                .with_target(false)
                .with_span_events(if include_spans {
                    fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
                } else {
                    fmt::format::FmtSpan::NONE
                });
            subscriber.with(fmt_layer).init();
        }
    }
}

/// Initialize logging from environment variables
pub fn init_default_logging() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let level = parse_level(&log_level);

    let format = env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let log_format = LogFormat::parse(&format);

    let include_spans = parse_spans_flag(&env::var("LOG_SPANS").unwrap_or_default());

    init_logging(level, log_format, include_spans);
}

/// Map a `LOG_LEVEL` value to a tracing level, INFO when unrecognized
pub fn parse_level(value: &str) -> Level {
    match value.to_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "INFO" => Level::INFO,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// `LOG_SPANS` is on only for a case-insensitive `true`
pub fn parse_spans_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Span covering one inbound `/orchestrate` request
#[macro_export]
macro_rules! relay_span {
    ($($field:tt)*) => {
        tracing::info_span!("relay_request", $($field)*)
    };
}

/// Span covering one outbound call to the downstream agent
#[macro_export]
macro_rules! forward_span {
    ($($field:tt)*) => {
        tracing::info_span!("agent_forward", $($field)*)
    };
}

// Re-export macros for convenience
pub use {forward_span, relay_span};
