//! Mock implementations for testing
//!
//! Provides pinned and stepping clocks for the forwarder and a scripted
//! orchestrator for exercising the relay endpoint without a downstream agent.

use crate::error::{RelayError, RelayResult};
use crate::forwarder::Clock;
use crate::orchestrator::Orchestrator;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Clock that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self { instant }
    }

    /// One second before midnight on December 31st of `year`, UTC
    pub fn at_year_end(year: i32) -> Self {
        Self::new(last_second_of(year))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

/// Clock that walks through a list of instants, one per call
///
/// After the last instant it keeps returning the last one.
#[derive(Debug)]
pub struct SteppingClock {
    instants: Vec<DateTime<FixedOffset>>,
    cursor: AtomicUsize,
}

impl SteppingClock {
    pub fn new(instants: Vec<DateTime<FixedOffset>>) -> Self {
        assert!(!instants.is_empty(), "SteppingClock needs at least one instant");
        Self {
            instants,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Last second of `year` followed by the first second of `year + 1`
    pub fn across_new_year(year: i32) -> Self {
        Self::new(vec![last_second_of(year), first_second_of(year + 1)])
    }

    /// How many times the clock has been read
    pub fn reads(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.instants[index.min(self.instants.len() - 1)]
    }
}

fn last_second_of(year: i32) -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(year, 12, 31, 23, 59, 59)
        .single()
        .map(|instant| instant.fixed_offset())
        .unwrap_or_else(|| panic!("invalid year {year}"))
}

fn first_second_of(year: i32) -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .map(|instant| instant.fixed_offset())
        .unwrap_or_else(|| panic!("invalid year {year}"))
}

/// What a [`MockOrchestrator`] does when called
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this string as the result
    Reply(String),
    /// Return `RelayError::Internal` with this message
    Fail(String),
    /// Panic with this message inside the orchestration task
    Panic(String),
    /// Echo the message back
    Echo,
}

/// Scripted orchestrator that records every message it receives
#[derive(Debug, Clone)]
pub struct MockOrchestrator {
    behavior: MockBehavior,
    pub received: Arc<Mutex<Vec<String>>>,
}

impl MockOrchestrator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(result: impl Into<String>) -> Self {
        Self::new(MockBehavior::Reply(result.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fail(message.into()))
    }

    pub fn panicking(message: impl Into<String>) -> Self {
        Self::new(MockBehavior::Panic(message.into()))
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub async fn get_received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl Orchestrator for MockOrchestrator {
    async fn orchestrate(&self, message: &str) -> RelayResult<String> {
        self.received.lock().await.push(message.to_string());

        match &self.behavior {
            MockBehavior::Reply(result) => Ok(result.clone()),
            MockBehavior::Fail(reason) => Err(RelayError::internal(reason.clone())),
            MockBehavior::Panic(reason) => panic!("{reason}"),
            MockBehavior::Echo => Ok(message.to_string()),
        }
    }

    fn name(&self) -> &str {
        "mock_orchestrator"
    }
}
