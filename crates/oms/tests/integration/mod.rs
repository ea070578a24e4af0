//! Integration tests for the order management core.
//!
//! These drive `OrderManager` end to end against the scripted gateway:
//! - Batch submission and per-row isolation
//! - Futures close sweeps
//! - Deadlines and notifier failures

pub mod common;
