//! Setter compiler
//!
//! Turns a [`Setter`] into a [`CompiledSetter`]: a mutator that can be run
//! against any model of the entity, the list of touched columns, and the
//! SQL `SET` expressions for store-side bulk updates.

use super::setter::{BinaryOp, FieldBinding, Setter, SetterShape, ValueExpr};
use super::value::{arithmetic, assign, coerce_for_column, date_of};
use crate::contract::{StorageEntity, StorageError};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{BinOper, IntoColumnRef, SimpleExpr};
use sea_orm::{EntityTrait, IdenStatic, ModelTrait, Value};

/// Reject anything but a non-empty field initialization.
///
/// Runs before stamping, so an empty caller setter is reported as empty even
/// though stamping would have added service fields to it.
pub fn check_shape<E: EntityTrait>(setter: &Setter<E>) -> Result<(), StorageError> {
    match setter.shape() {
        SetterShape::Init(bindings) if bindings.is_empty() => Err(StorageError::EmptySpecification),
        SetterShape::Init(_) => Ok(()),
        other => Err(StorageError::invalid(format!(
            "setter must be a field initialization, got {} shape",
            other.kind()
        ))),
    }
}

/// Compile `setter`, resolving clock references to `now`
pub fn compile<E: StorageEntity>(
    setter: Setter<E>,
    now: DateTime<Utc>,
) -> Result<CompiledSetter<E>, StorageError> {
    check_shape(&setter)?;
    let SetterShape::Init(bindings) = setter.into_shape() else {
        return Err(StorageError::invalid("setter must be a field initialization"));
    };

    let mut compiled: Vec<FieldBinding<E::Column>> = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let name = binding.column.as_str();
        if name == E::ID.as_str() {
            return Err(StorageError::invalid(format!(
                "identity column `{name}` cannot be assigned"
            )));
        }
        if compiled.iter().any(|b| b.column.as_str() == name) {
            return Err(StorageError::invalid(format!(
                "field `{name}` is bound more than once"
            )));
        }

        let expr = match fold(binding.expr, now)? {
            ValueExpr::Value(value) => ValueExpr::Value(coerce_for_column::<E>(binding.column, value)?),
            expr => expr,
        };
        compiled.push(FieldBinding::new(binding.column, expr));
    }

    Ok(CompiledSetter { bindings: compiled })
}

/// Resolve `Now` and evaluate every row-independent subexpression
fn fold<C>(expr: ValueExpr<C>, now: DateTime<Utc>) -> Result<ValueExpr<C>, StorageError> {
    let folded = match expr {
        ValueExpr::Now => ValueExpr::Value(Value::from(now)),
        ValueExpr::DateOf(inner) => match fold(*inner, now)? {
            ValueExpr::Value(value) => ValueExpr::Value(date_of(&value)?),
            inner => ValueExpr::DateOf(Box::new(inner)),
        },
        ValueExpr::Binary { op, lhs, rhs } => match (fold(*lhs, now)?, fold(*rhs, now)?) {
            (ValueExpr::Value(l), ValueExpr::Value(r)) => ValueExpr::Value(arithmetic(op, &l, &r)?),
            (lhs, rhs) => ValueExpr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        },
        expr => expr,
    };
    Ok(folded)
}

/// Compiled setter for entity `E`
pub struct CompiledSetter<E: StorageEntity> {
    bindings: Vec<FieldBinding<E::Column>>,
}

impl<E: StorageEntity> CompiledSetter<E> {
    /// Columns written by this setter, in binding order
    pub fn touched(&self) -> Vec<E::Column> {
        self.bindings.iter().map(|b| b.column).collect()
    }

    pub fn touched_names(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.name()).collect()
    }

    /// Apply every binding to `model`.
    ///
    /// All expressions see the model as it was before the first assignment.
    /// On error `model` is left untouched.
    pub fn apply(&self, model: &mut E::Model) -> Result<(), StorageError> {
        let mut next = model.clone();
        for binding in &self.bindings {
            let value = eval::<E>(&binding.expr, model)?;
            assign::<E>(&mut next, binding.column, value)?;
        }
        *model = next;
        Ok(())
    }

    /// `SET` expressions for a store-side update
    pub fn column_exprs(&self) -> Result<Vec<(E::Column, SimpleExpr)>, StorageError> {
        self.bindings
            .iter()
            .map(|b| Ok((b.column, to_sql(&b.expr)?)))
            .collect()
    }

    /// Current values of the touched columns of `model`
    pub fn values_of(&self, model: &E::Model) -> Vec<(E::Column, Value)> {
        self.touched()
            .into_iter()
            .map(|column| (column, model.get(column)))
            .collect()
    }
}

impl<E: StorageEntity> std::fmt::Debug for CompiledSetter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSetter")
            .field("bindings", &self.bindings)
            .finish()
    }
}

fn eval<E: StorageEntity>(
    expr: &ValueExpr<E::Column>,
    row: &E::Model,
) -> Result<Value, StorageError> {
    match expr {
        ValueExpr::Value(value) => Ok(value.clone()),
        ValueExpr::Current(column) => Ok(row.get(*column)),
        ValueExpr::DateOf(inner) => date_of(&eval::<E>(inner, row)?),
        ValueExpr::Binary { op, lhs, rhs } => {
            arithmetic(*op, &eval::<E>(lhs, row)?, &eval::<E>(rhs, row)?)
        }
        ValueExpr::Now => Err(StorageError::invalid("clock time was not resolved")),
    }
}

fn sql_oper(op: BinaryOp) -> BinOper {
    match op {
        BinaryOp::Add => BinOper::Add,
        BinaryOp::Sub => BinOper::Sub,
        BinaryOp::Mul => BinOper::Mul,
    }
}

fn to_sql<C: IdenStatic>(expr: &ValueExpr<C>) -> Result<SimpleExpr, StorageError> {
    match expr {
        ValueExpr::Value(value) => Ok(SimpleExpr::Value(value.clone())),
        ValueExpr::Current(column) => Ok(SimpleExpr::Column((*column).into_column_ref())),
        ValueExpr::Binary { op, lhs, rhs } => Ok(SimpleExpr::Binary(
            Box::new(to_sql(lhs)?),
            sql_oper(*op),
            Box::new(to_sql(rhs)?),
        )),
        ValueExpr::DateOf(_) => Err(StorageError::invalid(
            "date_of over a column cannot run as a store-side update",
        )),
        ValueExpr::Now => Err(StorageError::invalid("clock time was not resolved")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::setter::{current, now, val};
    use chrono::TimeZone;
    use sea_orm::{ColumnTrait, Condition};

    mod item {
        use crate::Untracked;
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, Default, DeriveEntityModel)]
        #[sea_orm(table_name = "item")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub qty: i32,
            pub reserved: i32,
            pub label: String,
            pub touched_at: DateTimeUtc,
            pub day: Date,
            pub state: State,
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum)]
        #[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
        pub enum State {
            #[default]
            #[sea_orm(string_value = "open")]
            Open,
            #[sea_orm(string_value = "closed")]
            Closed,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}

        impl crate::StorageEntity for Entity {
            const ID: Column = Column::Id;
            type Stamp = Untracked;
        }
    }

    use item::{Column, Entity, Model, State};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_self_reference_resolves_against_target() {
        let compiled = compile(
            Setter::<Entity>::init().set(Column::Qty, current(Column::Qty) + val(1)),
            at(),
        )
        .unwrap();

        let mut a = Model { qty: 1, ..Default::default() };
        let mut b = Model { qty: 41, ..Default::default() };
        compiled.apply(&mut a).unwrap();
        compiled.apply(&mut b).unwrap();

        assert_eq!(a.qty, 2);
        assert_eq!(b.qty, 42);
        assert_eq!(compiled.touched_names(), vec!["qty"]);
        assert!(matches!(compiled.touched().as_slice(), [Column::Qty]));
    }

    #[test]
    fn test_bindings_see_the_row_before_assignment() {
        let compiled = compile(
            Setter::<Entity>::init()
                .set(Column::Qty, current(Column::Reserved))
                .set(Column::Reserved, current(Column::Qty)),
            at(),
        )
        .unwrap();

        let mut model = Model { qty: 3, reserved: 7, ..Default::default() };
        compiled.apply(&mut model).unwrap();

        assert_eq!((model.qty, model.reserved), (7, 3));
    }

    #[test]
    fn test_now_and_date_are_folded() {
        let compiled = compile(
            Setter::<Entity>::init()
                .set(Column::TouchedAt, now())
                .set(Column::Day, now::<Column>().date()),
            at(),
        )
        .unwrap();

        let mut model = Model::default();
        compiled.apply(&mut model).unwrap();

        assert_eq!(model.touched_at, at());
        assert_eq!(model.day, at().date_naive());
    }

    #[test]
    fn test_rejects_empty_and_non_init_shapes() {
        let empty = compile(Setter::<Entity>::init(), at()).unwrap_err();
        assert!(matches!(empty, StorageError::EmptySpecification));

        let identity = compile(Setter::<Entity>::identity(), at()).unwrap_err();
        assert!(matches!(identity, StorageError::InvalidSpecification { .. }));

        let conditional = Setter::<Entity>::conditional(
            Condition::all().add(Column::Qty.gt(0)),
            Setter::init().set_value(Column::Qty, 0),
            Setter::init().set_value(Column::Qty, 1),
        );
        let err = compile(conditional, at()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidSpecification { .. }));
    }

    #[test]
    fn test_rejects_duplicate_identity_and_mistyped_bindings() {
        let duplicate = Setter::<Entity>::init()
            .set_value(Column::Qty, 1)
            .set_value(Column::Qty, 2);
        assert!(compile(duplicate, at()).unwrap_err().is_specification_error());

        let identity = Setter::<Entity>::init().set_value(Column::Id, 9i64);
        assert!(compile(identity, at()).unwrap_err().is_specification_error());

        let mistyped = Setter::<Entity>::init().set_value(Column::Qty, "lots");
        assert!(compile(mistyped, at()).unwrap_err().is_specification_error());

        let overflow = Setter::<Entity>::init().set_value(Column::Qty, i64::MAX);
        assert!(compile(overflow, at()).unwrap_err().is_specification_error());
    }

    #[test]
    fn test_enum_columns_accept_only_declared_values() {
        let unknown = Setter::<Entity>::init().set_value(Column::State, "bogus");
        let err = compile(unknown, at()).unwrap_err();
        assert!(err.is_specification_error(), "{err}");

        let compiled = compile(
            Setter::<Entity>::init().set_value(Column::State, "closed"),
            at(),
        )
        .unwrap();
        let mut model = Model::default();
        compiled.apply(&mut model).unwrap();
        assert_eq!(model.state, State::Closed);
    }

    #[test]
    fn test_failed_apply_leaves_model_untouched() {
        let compiled = compile(
            Setter::<Entity>::init()
                .set_value(Column::Qty, 5)
                .set(Column::Reserved, current(Column::Label) + val(1)),
            at(),
        )
        .unwrap();

        let mut model = Model { qty: 1, label: "x".to_owned(), ..Default::default() };
        assert!(compiled.apply(&mut model).is_err());
        assert_eq!(model.qty, 1);
    }

    #[test]
    fn test_column_exprs_render_store_side_arithmetic() {
        let compiled = compile(
            Setter::<Entity>::init()
                .set(Column::Qty, current(Column::Qty) - val(2))
                .set_value(Column::Label, "sold"),
            at(),
        )
        .unwrap();

        let exprs = compiled.column_exprs().unwrap();
        assert_eq!(exprs.len(), 2);
        assert!(matches!(exprs[0].1, SimpleExpr::Binary(_, BinOper::Sub, _)));
        assert_eq!(exprs[1].1, SimpleExpr::Value(Value::from("sold")));

        let row_dependent_date = compile(
            Setter::<Entity>::init().set(Column::Day, current(Column::TouchedAt).date()),
            at(),
        )
        .unwrap();
        assert!(row_dependent_date.column_exprs().is_err());
    }
}
