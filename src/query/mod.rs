pub mod builder;
pub mod cache;
pub mod options;

pub use builder::QueryEngine;
pub use cache::QueryCache;
pub use options::{
    ComparisonReport, ComparisonRequest, LocationSelector, QueryMeta, QueryOptions, QueryResult,
};
