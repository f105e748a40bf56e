//! SQLite backend for the Strata temporal store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Tables are derived from record
//! schemas and every statement is generated at runtime.

mod encode;
mod statement;
mod store;

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod mapper;
pub mod schema;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::SqliteStore;
