//! Database layer for trackgate
//!
//! SQLite storage for the bundled tracker's hits and for application settings
//! such as the first-run fact.

pub mod repo;
pub mod schema;

pub use repo::Database;
