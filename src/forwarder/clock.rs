//! Time source for outbound payloads
//!
//! The forwarder stamps every payload with the calendar year at call time.
//! Reading the year through [`Clock`] lets tests pin or step the instant.

use chrono::{DateTime, Datelike, FixedOffset, Local};

/// Source of the current wall-clock instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Four-digit calendar year of [`Clock::now`]
    fn current_year(&self) -> String {
        format!("{:04}", self.now().year())
    }
}

/// Local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}
