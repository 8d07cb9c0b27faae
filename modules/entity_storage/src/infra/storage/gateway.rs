//! SeaORM entity storage gateway

use crate::contract::{EntityStorage, Pagination, StorageEntity, StorageError};
use crate::domain::clock::Clock;
use crate::domain::compiler::{check_shape, compile};
use crate::domain::setter::Setter;
use crate::domain::stamper::{service_setter, stamp, Stamping, WriteGuard, WritePath};
use crate::domain::value::{as_i64, identity_of, set_identity};
use async_trait::async_trait;
use sea_orm::sea_query::{IntoValueTuple, SimpleExpr, ValueTuple};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, IdenStatic, Iterable,
    ModelTrait, PaginatorTrait, QueryFilter, QuerySelect, Select,
};
use std::sync::Arc;

pub struct SeaOrmEntityStorage {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
    version_check: bool,
}

impl SeaOrmEntityStorage {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            version_check: false,
        }
    }

    /// Reject single-row updates whose model holds a stale version
    pub fn with_version_check(mut self, enabled: bool) -> Self {
        self.version_check = enabled;
        self
    }

    fn table<E: StorageEntity>() -> String {
        E::default().table_name().to_owned()
    }

    fn guard_for<E: StorageEntity>(&self, model: &E::Model) -> Option<WriteGuard> {
        if self.version_check {
            <E::Stamp as Stamping<E>>::write_guard(model)
        } else {
            None
        }
    }

    /// Apply the service bindings of `path` to `model`
    fn stamp_model<E: StorageEntity>(
        &self,
        model: &mut E::Model,
        path: WritePath,
    ) -> Result<(), StorageError> {
        let stamper = service_setter::<E>(path);
        if stamper.bindings().is_some_and(|b| !b.is_empty()) {
            compile(stamper, self.clock.now())?.apply(model)?;
        }
        Ok(())
    }

    /// Insert every column of `model` except the identity
    async fn insert<E: StorageEntity>(&self, model: &E::Model) -> Result<i64, StorageError> {
        let mut active = <E::ActiveModel as ActiveModelTrait>::default();
        for column in E::Column::iter() {
            if column.as_str() != E::ID.as_str() {
                active.try_set(column, model.get(column))?;
            }
        }

        let result = E::insert(active).exec(&*self.db).await?;
        match result.last_insert_id.into_value_tuple() {
            ValueTuple::One(value) => as_i64(&value).ok_or_else(|| {
                StorageError::invalid(format!("store assigned a non-integer identity: {value:?}"))
            }),
            other => Err(StorageError::invalid(format!(
                "entity must have a single identity column, got {other:?}"
            ))),
        }
    }

    /// Write `columns` to the row `id`. Returns the number of rows written.
    async fn write_columns<E: StorageEntity>(
        &self,
        id: i64,
        columns: Vec<(E::Column, SimpleExpr)>,
        guard: Option<&WriteGuard>,
    ) -> Result<u64, StorageError> {
        let mut update = E::update_many().filter(E::ID.eq(id));
        if let Some(guard) = guard {
            update = update.filter(guard.condition.clone());
        }
        for (column, expr) in columns {
            update = update.col_expr(column, expr);
        }

        Ok(update.exec(&*self.db).await?.rows_affected)
    }

    /// Error for a single-row write that matched nothing
    async fn not_updated<E: StorageEntity>(
        &self,
        id: i64,
        guard: Option<WriteGuard>,
    ) -> StorageError {
        let Some(guard) = guard else {
            return StorageError::Store(DbErr::RecordNotUpdated);
        };
        match self.find_by_id::<E>(id).await {
            Ok(Some(_)) => StorageError::VersionConflict {
                id,
                expected: guard.expected,
            },
            Ok(None) => StorageError::Store(DbErr::RecordNotUpdated),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl EntityStorage for SeaOrmEntityStorage {
    async fn all<E: StorageEntity>(&self, query: Select<E>) -> Result<Vec<E::Model>, StorageError> {
        Ok(query.all(&*self.db).await?)
    }

    async fn first<E: StorageEntity>(
        &self,
        query: Select<E>,
    ) -> Result<Option<E::Model>, StorageError> {
        Ok(query.one(&*self.db).await?)
    }

    async fn find_by_id<E: StorageEntity>(
        &self,
        id: i64,
    ) -> Result<Option<E::Model>, StorageError> {
        let result = E::find().filter(E::ID.eq(id)).one(&*self.db).await?;
        Ok(result)
    }

    async fn paginate<E: StorageEntity>(
        &self,
        query: Select<E>,
        page_number: u64,
        limit: u64,
    ) -> Result<Pagination<E::Model>, StorageError> {
        let page_number = page_number.max(1);
        let total_count = query.clone().count(&*self.db).await?;

        let entities = if limit == 0 {
            Vec::new()
        } else {
            query
                .offset((page_number - 1).saturating_mul(limit))
                .limit(limit)
                .all(&*self.db)
                .await?
        };

        Ok(Pagination {
            entities,
            total_count,
            limit,
            page_number,
        })
    }

    async fn create<E: StorageEntity>(&self, model: &mut E::Model) -> Result<i64, StorageError> {
        let mut next = model.clone();
        self.stamp_model::<E>(&mut next, WritePath::Create)?;

        let id = self.insert::<E>(&next).await?;
        set_identity::<E>(&mut next, id)?;
        *model = next;

        tracing::debug!(table = %Self::table::<E>(), id, "created row");
        Ok(id)
    }

    async fn create_if_not_exist<E: StorageEntity>(
        &self,
        matching: Condition,
        creator: Setter<E>,
    ) -> Result<u64, StorageError> {
        check_shape(&creator)?;
        let compiled = compile(stamp(creator, WritePath::Create), self.clock.now())?;
        let mut fresh = E::Model::default();
        compiled.apply(&mut fresh)?;

        let existing = E::find().filter(matching).count(&*self.db).await?;
        if existing > 0 {
            tracing::debug!(table = %Self::table::<E>(), existing, "row exists, nothing created");
            return Ok(0);
        }

        let id = self.insert::<E>(&fresh).await?;
        tracing::debug!(
            table = %Self::table::<E>(),
            id,
            touched = ?compiled.touched_names(),
            "created row"
        );
        Ok(1)
    }

    async fn update_entity<E: StorageEntity>(
        &self,
        model: &mut E::Model,
    ) -> Result<(), StorageError> {
        let id = identity_of::<E>(model)?;
        let guard = self.guard_for::<E>(model);

        let mut next = model.clone();
        self.stamp_model::<E>(&mut next, WritePath::Update)?;

        let columns = E::Column::iter()
            .filter(|column| column.as_str() != E::ID.as_str())
            .map(|column| (column, SimpleExpr::Value(next.get(column))))
            .collect();
        let rows = self.write_columns::<E>(id, columns, guard.as_ref()).await?;
        if rows == 0 {
            return Err(self.not_updated::<E>(id, guard).await);
        }
        *model = next;

        tracing::debug!(table = %Self::table::<E>(), id, "updated row");
        Ok(())
    }

    async fn update<E: StorageEntity>(
        &self,
        matching: Condition,
        setter: Setter<E>,
    ) -> Result<u64, StorageError> {
        check_shape(&setter)?;
        let compiled = compile(stamp(setter, WritePath::Update), self.clock.now())?;
        let exprs = compiled.column_exprs()?;

        let mut update = E::update_many().filter(matching);
        for (column, expr) in exprs {
            update = update.col_expr(column, expr);
        }
        let rows = update.exec(&*self.db).await?.rows_affected;

        tracing::debug!(
            table = %Self::table::<E>(),
            rows,
            touched = ?compiled.touched_names(),
            "bulk update"
        );
        Ok(rows)
    }

    async fn update_single<E: StorageEntity>(
        &self,
        model: &mut E::Model,
        setter: Setter<E>,
    ) -> Result<(), StorageError> {
        check_shape(&setter)?;
        let compiled = compile(stamp(setter, WritePath::Update), self.clock.now())?;
        let id = identity_of::<E>(model)?;
        let guard = self.guard_for::<E>(model);

        let mut next = model.clone();
        compiled.apply(&mut next)?;

        let columns = compiled
            .values_of(&next)
            .into_iter()
            .map(|(column, value)| (column, SimpleExpr::Value(value)))
            .collect();
        let rows = self.write_columns::<E>(id, columns, guard.as_ref()).await?;
        if rows == 0 {
            return Err(self.not_updated::<E>(id, guard).await);
        }
        *model = next;

        tracing::debug!(
            table = %Self::table::<E>(),
            id,
            touched = ?compiled.touched_names(),
            "updated row"
        );
        Ok(())
    }

    async fn remove<E: StorageEntity>(&self, matching: Condition) -> Result<(), StorageError> {
        let result = E::delete_many().filter(matching).exec(&*self.db).await?;
        tracing::debug!(table = %Self::table::<E>(), rows = result.rows_affected, "removed rows");
        Ok(())
    }
}
