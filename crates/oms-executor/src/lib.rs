//! Order routing for the order management core.
//!
//! # Key Components
//!
//! - [`OrderRouter`]: Single and batched spot/futures order submission
//! - [`OrderTable`]: Tabular batch input (`Symbol, Side, Size, Price`)
//! - [`SymbolLocks`]: Per-symbol critical sections shared with the closer
//!
//! # Order Path (in `OrderRouter::place_order`)
//!
//! 1. Local validation -> `ValidationError`
//! 2. Symbol lock
//! 3. Futures only: notional conversion at mark, step/tick flooring
//! 4. Gateway submission -> `OrderOutcome::Success` / `OrderOutcome::Failure`
//! 5. Notification

pub mod batch;
pub mod error;
pub mod locks;
pub mod router;

pub use batch::{OrderRow, OrderTable};
pub use error::{ExecutorError, ExecutorResult};
pub use locks::SymbolLocks;
pub use router::{OrderRouter, RouterConfig};
