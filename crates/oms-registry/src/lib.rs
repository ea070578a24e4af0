//! Instrument precision resolution.
//!
//! Resolves step/tick filters per futures instrument from exchange info and
//! caches them for the session, with age-based refresh.

pub mod error;
pub mod resolver;

pub use error::{RegistryError, RegistryResult};
pub use resolver::PrecisionResolver;
