//! Core types and trait definitions for the Strata temporal store.
//!
//! This crate is free of database dependencies. It describes records and
//! their versioning metadata, builds predicates and temporal reads, decides
//! how states change on save/delete/restore, and defines the
//! [`TemporalStore`](store::TemporalStore) trait that backends implement.

pub mod catalog;
pub mod codec;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod predicate;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod system;
pub mod value;

pub use error::{CodecError, Error, Result, ValueError};
