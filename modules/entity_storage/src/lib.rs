//! Entity Storage Module
//!
//! Generic CRUD gateway over SeaORM entities. Writes are described by
//! declarative setters (`count = count + 1`) that are compiled once and either
//! applied to an in-memory model or rendered into a single SQL `UPDATE`.
//! Audit and version columns are stamped according to each entity's policy.

// Public exports
pub mod contract;
pub use contract::{
    EntityStorage, HasAuditFields, HasVersionFields, Pagination, StorageEntity, StorageError,
};

pub mod domain;
pub use domain::{
    current, now, val, Audited, Clock, ManualClock, Setter, SystemClock, Untracked, ValueExpr,
    Versioned,
};

pub mod module;
pub use module::EntityStorageModule;

pub mod config;
pub use config::Config;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod infra;
pub use infra::storage::{EntityRegistry, SeaOrmEntityStorage};
