//! Contract layer - public API of the storage gateway
//!
//! Capability traits for entity shapes, the gateway trait and its error type.

pub mod client;
pub mod error;
pub mod model;

pub use client::EntityStorage;
pub use error::StorageError;
pub use model::{HasAuditFields, HasVersionFields, Pagination, StorageEntity};
