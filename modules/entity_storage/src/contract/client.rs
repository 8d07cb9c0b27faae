//! Storage gateway trait
//!
//! The operations every entity shape gets: create, conditional create,
//! full-row update, setter-driven partial update (single row or bulk),
//! delete, and the read helpers around them.

use super::{
    error::StorageError,
    model::{Pagination, StorageEntity},
};
use crate::domain::setter::Setter;
use crate::domain::value::identity_of;
use async_trait::async_trait;
use sea_orm::{Condition, DbErr, Select};

/// Entity storage API
#[async_trait]
pub trait EntityStorage: Send + Sync {
    // ===== Reads =====

    /// Start a query over `E`. Reads are never cached.
    fn select<E: StorageEntity>(&self) -> Select<E> {
        E::find()
    }

    /// Execute a query and return every row
    async fn all<E: StorageEntity>(&self, query: Select<E>) -> Result<Vec<E::Model>, StorageError>;

    /// Execute a query and return its first row
    async fn first<E: StorageEntity>(
        &self,
        query: Select<E>,
    ) -> Result<Option<E::Model>, StorageError>;

    /// Find a row by identity
    async fn find_by_id<E: StorageEntity>(&self, id: i64)
        -> Result<Option<E::Model>, StorageError>;

    /// Fetch a row by identity, failing if it does not exist
    async fn get_by_id<E: StorageEntity>(&self, id: i64) -> Result<E::Model, StorageError> {
        self.find_by_id::<E>(id).await?.ok_or_else(|| {
            StorageError::Store(DbErr::RecordNotFound(format!(
                "{} with id {}",
                E::default().table_name(),
                id
            )))
        })
    }

    /// Re-read the committed state of a row
    async fn reload<E: StorageEntity>(&self, model: &E::Model) -> Result<E::Model, StorageError> {
        let id = identity_of::<E>(model)?;
        self.get_by_id::<E>(id).await
    }

    /// Run a query one page at a time. Page numbers start at 1; 0 is read as 1.
    async fn paginate<E: StorageEntity>(
        &self,
        query: Select<E>,
        page_number: u64,
        limit: u64,
    ) -> Result<Pagination<E::Model>, StorageError>;

    // ===== Writes =====

    /// Insert a new row. Audit fields and the assigned identity are written
    /// back into `model`.
    async fn create<E: StorageEntity>(&self, model: &mut E::Model) -> Result<i64, StorageError>;

    /// Insert a new row and return it with its identity
    async fn create_entity<E: StorageEntity>(
        &self,
        mut model: E::Model,
    ) -> Result<E::Model, StorageError> {
        self.create::<E>(&mut model).await?;
        Ok(model)
    }

    /// Insert a row built from `creator` unless a row matches `matching`.
    /// Returns the number of rows created.
    async fn create_if_not_exist<E: StorageEntity>(
        &self,
        matching: Condition,
        creator: Setter<E>,
    ) -> Result<u64, StorageError>;

    /// Write every column of `model` to its row. Same stale-model caveat as
    /// [`update_single`](Self::update_single).
    async fn update_entity<E: StorageEntity>(&self, model: &mut E::Model)
        -> Result<(), StorageError>;

    /// Apply `setter` to every row matching `matching` in one statement.
    /// Returns the number of rows affected.
    async fn update<E: StorageEntity>(
        &self,
        matching: Condition,
        setter: Setter<E>,
    ) -> Result<u64, StorageError>;

    /// Apply `setter` to `model` and persist only the touched columns.
    ///
    /// Service columns are computed from `model`, not from the stored row.
    /// The stored version never decreases only while `model` is the latest
    /// read. A stale copy writes its own older version back. Enable
    /// `version_check` to reject such writes with `VersionConflict`.
    async fn update_single<E: StorageEntity>(
        &self,
        model: &mut E::Model,
        setter: Setter<E>,
    ) -> Result<(), StorageError>;

    /// Delete every row matching `matching`
    async fn remove<E: StorageEntity>(&self, matching: Condition) -> Result<(), StorageError>;
}
