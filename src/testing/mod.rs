//! Testing utilities and mock implementations
//!
//! Clocks and orchestrators for exercising the relay without a real
//! downstream agent or a real calendar.

pub mod mocks;

pub use mocks::*;
