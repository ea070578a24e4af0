//! Order management core.
//!
//! Turns trading intents into exchange-compliant spot and futures orders,
//! closes leveraged positions under a sizing policy, and reports every
//! outcome without conflating rejections, failures and unclosable positions.
//!
//! # Key Components
//!
//! - [`OrderManagement`]: The capability interface callers depend on
//! - [`OrderManager`]: Default implementation over an `ExchangeGateway`
//! - [`OmsConfig`]: TOML configuration handed to the constructor
//! - [`AuditLog`]: Append-only history of what the manager did

pub mod audit;
pub mod config;
pub mod error;
pub mod manager;

pub use audit::{AuditEntry, AuditEvent, AuditLog};
pub use config::{Credentials, OmsConfig};
pub use error::{OmsError, OmsResult};
pub use manager::{BoxFuture, DynOrderManagement, OrderManagement, OrderManager};

pub use oms_core::{
    BatchResult, CloseOutcome, CloseReport, FailureKind, MarketKind, OrderOutcome, OrderRequest,
    OrderSide, OrderType, QuantityUnit,
};
pub use oms_executor::{OrderRow, OrderTable};
pub use oms_position::{format_usd, render_positions_table, CloseSizingPolicy};
