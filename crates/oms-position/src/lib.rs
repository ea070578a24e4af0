//! Futures position management.
//!
//! - [`PositionCloser`]: Best-effort reduce-only close sweep
//! - [`CloseSizingPolicy`]: How much of each position to close
//! - [`AccountQueries`]: Read-only balance and position projections

pub mod closer;
pub mod error;
pub mod query;
pub mod sizing;

pub use closer::{CloserConfig, PositionCloser};
pub use error::{PositionError, PositionResult};
pub use query::{format_usd, render_positions_table, AccountQueries};
pub use sizing::CloseSizingPolicy;
