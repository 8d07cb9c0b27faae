//! Contract models for entity storage
//!
//! Entity shapes are plain SeaORM entities. The capability traits below name
//! the service columns the gateway maintains, so the choice of stamping is
//! made by the compiler instead of by inspecting types at runtime.

use crate::domain::stamper::Stamping;
use sea_orm::EntityTrait;

/// An entity with a store-assigned integer identity.
///
/// The identity is zero before the first insert and never changes after it.
/// `Model: Default` provides the blank row that creation setters fill in.
pub trait StorageEntity:
    EntityTrait<Model: Default + Send + Sync, ActiveModel: Send + Sync> + Send + Sync
{
    /// Identity column
    const ID: Self::Column;

    /// Service-column policy: [`Untracked`](crate::Untracked),
    /// [`Audited`](crate::Audited) or [`Versioned`](crate::Versioned)
    type Stamp: Stamping<Self>;
}

/// Entity carrying creation audit fields.
pub trait HasAuditFields: StorageEntity {
    /// Set once, at creation
    const CREATION_TIME: Self::Column;
    /// Date-only part of the creation time
    const SORT_DATE: Self::Column;
}

/// Entity carrying a version counter and a modification timestamp.
pub trait HasVersionFields: HasAuditFields {
    /// Starts at 0, incremented by exactly 1 on every update
    const VERSION: Self::Column;
    /// Set to the current time on every update
    const MODIFICATION_TIME: Self::Column;
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination<T> {
    /// Rows on this page
    pub entities: Vec<T>,
    /// Number of rows matching the query across all pages
    pub total_count: u64,
    /// Page size
    pub limit: u64,
    /// 1-based page number as requested
    pub page_number: u64,
}

impl<T> Pagination<T> {
    /// Number of pages needed to hold `total_count` rows
    pub fn page_count(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.limit)
    }
}
