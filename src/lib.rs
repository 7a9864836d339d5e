//! Real-estate listing query engine: typed filters compiled to parameterised
//! SQL, store-side market statistics, pure market calculations, and an
//! orchestrator that assembles them per request.

pub mod aggregator;
pub mod api;
pub mod calc;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod monitor;
pub mod query;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{AppError, Result};
pub use query::{QueryEngine, QueryOptions, QueryResult};
