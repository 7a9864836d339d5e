pub mod models;
pub mod sql;
pub mod store;

pub use store::Store;
