//! Exchange gateway abstraction.
//!
//! The order management core never talks to the exchange directly. It consumes
//! the `ExchangeGateway` capability set through `Arc<dyn ExchangeGateway>`:
//! - `TimedGateway` bounds every call with a deadline
//! - `MockGateway` is a scripted in-memory exchange for tests

pub mod error;
pub mod gateway;
pub mod mock;
pub mod timed;

pub use error::{GatewayError, GatewayResult, MIN_NOTIONAL_CODE};
pub use gateway::{BoxFuture, DynGateway, ExchangeGateway, ExchangeSymbolInfo, OrderParams};
pub use mock::{GatewayCall, MockGateway};
pub use timed::TimedGateway;
