//! Concurrency stamper
//!
//! Adds the service-field bindings an entity's stamping policy asks for to a
//! caller's setter. Fields the caller bound explicitly are left alone.

use super::setter::{current, now, val, FieldBinding, Setter, SetterShape};
use super::value::as_i64;
use crate::contract::{HasAuditFields, HasVersionFields, StorageEntity};
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, EntityTrait, IdenStatic, ModelTrait};

/// Which write a setter is stamped for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    Create,
    Update,
}

/// Compare-and-swap condition for a single-row write
#[derive(Debug, Clone)]
pub struct WriteGuard {
    pub condition: SimpleExpr,
    /// Version the caller's model holds
    pub expected: i64,
}

/// Service-column policy of an entity
pub trait Stamping<E: EntityTrait>: Send + Sync + 'static {
    /// Bindings the policy contributes on `path`
    fn service_bindings(path: WritePath) -> Vec<FieldBinding<E::Column>>;

    /// Condition a single-row update of `model` must also satisfy when
    /// version checking is on
    fn write_guard(_model: &E::Model) -> Option<WriteGuard> {
        None
    }
}

/// No service columns
#[derive(Debug, Clone, Copy, Default)]
pub struct Untracked;

/// Creation time and sort date, set on create
#[derive(Debug, Clone, Copy, Default)]
pub struct Audited;

/// Audit fields plus version and modification time, maintained on update
#[derive(Debug, Clone, Copy, Default)]
pub struct Versioned;

impl<E: EntityTrait> Stamping<E> for Untracked {
    fn service_bindings(_path: WritePath) -> Vec<FieldBinding<E::Column>> {
        Vec::new()
    }
}

fn creation_bindings<E: HasAuditFields>() -> Vec<FieldBinding<E::Column>> {
    vec![
        FieldBinding::new(E::CREATION_TIME, now()),
        FieldBinding::new(E::SORT_DATE, now::<E::Column>().date()),
    ]
}

impl<E: HasAuditFields> Stamping<E> for Audited {
    fn service_bindings(path: WritePath) -> Vec<FieldBinding<E::Column>> {
        match path {
            WritePath::Create => creation_bindings::<E>(),
            WritePath::Update => Vec::new(),
        }
    }
}

impl<E: HasVersionFields> Stamping<E> for Versioned {
    fn service_bindings(path: WritePath) -> Vec<FieldBinding<E::Column>> {
        match path {
            WritePath::Create => creation_bindings::<E>(),
            WritePath::Update => vec![
                FieldBinding::new(E::VERSION, current(E::VERSION) + val(1)),
                FieldBinding::new(E::MODIFICATION_TIME, now()),
            ],
        }
    }

    fn write_guard(model: &E::Model) -> Option<WriteGuard> {
        let version = model.get(E::VERSION);
        let expected = as_i64(&version)?;
        Some(WriteGuard {
            condition: E::VERSION.eq(version),
            expected,
        })
    }
}

/// Augment `setter` with the service bindings of `E` for `path`.
///
/// Non-initialization shapes are returned as they are.
pub fn stamp<E: StorageEntity>(setter: Setter<E>, path: WritePath) -> Setter<E> {
    if !matches!(setter.shape(), SetterShape::Init(_)) {
        return setter;
    }

    let mut stamped = setter;
    for binding in <E::Stamp as Stamping<E>>::service_bindings(path) {
        if !stamped.binds(binding.column) {
            stamped = stamped.set(binding.column, binding.expr);
        }
    }
    stamped
}

/// Service bindings of `E` for `path` as a setter of their own
pub fn service_setter<E: StorageEntity>(path: WritePath) -> Setter<E> {
    stamp(Setter::init(), path)
}

/// Names of the columns `E` stamps on `path`
pub fn service_columns<E: StorageEntity>(path: WritePath) -> Vec<String> {
    <E::Stamp as Stamping<E>>::service_bindings(path)
        .iter()
        .map(|b| b.column.as_str().to_owned())
        .collect()
}
