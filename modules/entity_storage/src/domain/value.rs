//! Typed arithmetic and conversion over `sea_orm::Value`
//!
//! Setter expressions are evaluated to untyped `Value`s (integer arithmetic
//! yields `BigInt`, the clock yields `ChronoDateTimeUtc`). Before a value is
//! written into a model or bound into SQL it is converted to the variant the
//! field actually stores. `ModelTrait::set` panics on a value the field cannot
//! hold, so every value is first converted with [`coerce`] and then tried on
//! a scratch `ActiveModel` through the non-panicking `try_set`.

use crate::contract::{StorageEntity, StorageError};
use crate::domain::setter::BinaryOp;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use sea_orm::sea_query::ValueType;
use sea_orm::{ActiveModelTrait, ColumnTrait, IdenStatic, ModelTrait, Value};
use std::mem::discriminant;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

fn number(value: &Value) -> Option<Number> {
    let n = match value {
        Value::TinyInt(Some(v)) => Number::Int(i128::from(*v)),
        Value::SmallInt(Some(v)) => Number::Int(i128::from(*v)),
        Value::Int(Some(v)) => Number::Int(i128::from(*v)),
        Value::BigInt(Some(v)) => Number::Int(i128::from(*v)),
        Value::TinyUnsigned(Some(v)) => Number::Int(i128::from(*v)),
        Value::SmallUnsigned(Some(v)) => Number::Int(i128::from(*v)),
        Value::Unsigned(Some(v)) => Number::Int(i128::from(*v)),
        Value::BigUnsigned(Some(v)) => Number::Int(i128::from(*v)),
        Value::Float(Some(v)) => Number::Float(f64::from(*v)),
        Value::Double(Some(v)) => Number::Float(*v),
        _ => return None,
    };
    Some(n)
}

fn is_numeric(value: &Value) -> bool {
    matches!(
        value,
        Value::TinyInt(_)
            | Value::SmallInt(_)
            | Value::Int(_)
            | Value::BigInt(_)
            | Value::TinyUnsigned(_)
            | Value::SmallUnsigned(_)
            | Value::Unsigned(_)
            | Value::BigUnsigned(_)
            | Value::Float(_)
            | Value::Double(_)
    )
}

fn from_number(n: Number, template: &Value) -> Option<Value> {
    let value = match (template, n) {
        (Value::TinyInt(_), Number::Int(v)) => Value::from(<i8 as TryFrom<i128>>::try_from(v).ok()?),
        (Value::SmallInt(_), Number::Int(v)) => Value::from(<i16 as TryFrom<i128>>::try_from(v).ok()?),
        (Value::Int(_), Number::Int(v)) => Value::from(<i32 as TryFrom<i128>>::try_from(v).ok()?),
        (Value::BigInt(_), Number::Int(v)) => Value::from(<i64 as TryFrom<i128>>::try_from(v).ok()?),
        (Value::TinyUnsigned(_), Number::Int(v)) => Value::from(<u8 as TryFrom<i128>>::try_from(v).ok()?),
        (Value::SmallUnsigned(_), Number::Int(v)) => Value::from(<u16 as TryFrom<i128>>::try_from(v).ok()?),
        (Value::Unsigned(_), Number::Int(v)) => Value::from(<u32 as TryFrom<i128>>::try_from(v).ok()?),
        (Value::BigUnsigned(_), Number::Int(v)) => Value::from(<u64 as TryFrom<i128>>::try_from(v).ok()?),
        (Value::Float(_), n) => Value::from(n.as_f64() as f32),
        (Value::Double(_), n) => Value::from(n.as_f64()),
        _ => return None,
    };
    Some(value)
}

fn into_value(n: Number) -> Result<Value, StorageError> {
    match n {
        Number::Int(v) => {
            if let Ok(v) = <i64 as TryFrom<i128>>::try_from(v) {
                Ok(Value::from(v))
            } else if let Ok(v) = <u64 as TryFrom<i128>>::try_from(v) {
                Ok(Value::from(v))
            } else {
                Err(StorageError::invalid("integer overflow in setter expression"))
            }
        }
        Number::Float(v) => Ok(Value::from(v)),
    }
}

/// Apply `op` to two evaluated operands. A null operand yields null, as in SQL.
pub(crate) fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, StorageError> {
    if (is_null(lhs) && is_numeric(lhs)) || (is_null(rhs) && is_numeric(rhs)) {
        return Ok(Value::BigInt(None));
    }
    let (Some(l), Some(r)) = (number(lhs), number(rhs)) else {
        return Err(StorageError::invalid(format!(
            "`{op}` needs numeric operands, got {lhs:?} and {rhs:?}"
        )));
    };

    let result = match (l, r) {
        (Number::Int(a), Number::Int(b)) => {
            let v = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
            };
            Number::Int(v.ok_or_else(|| StorageError::invalid("integer overflow in setter expression"))?)
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            Number::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
            })
        }
    };
    into_value(result)
}

fn instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::ChronoDateTimeUtc(Some(_)) => {
            <DateTime<Utc> as ValueType>::try_from(value.clone()).ok()
        }
        Value::ChronoDateTime(Some(_)) => <NaiveDateTime as ValueType>::try_from(value.clone())
            .ok()
            .map(|naive| naive.and_utc()),
        Value::ChronoDateTimeWithTimeZone(Some(_)) => {
            <DateTime<FixedOffset> as ValueType>::try_from(value.clone())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }
        Value::ChronoDate(Some(_)) => <NaiveDate as ValueType>::try_from(value.clone())
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc()),
        _ => None,
    }
}

fn from_instant(at: DateTime<Utc>, template: &Value) -> Option<Value> {
    let value = match template {
        Value::ChronoDateTimeUtc(_) => Value::from(at),
        Value::ChronoDateTime(_) => Value::from(at.naive_utc()),
        Value::ChronoDateTimeWithTimeZone(_) => Value::from(at.fixed_offset()),
        Value::ChronoDate(_) => Value::from(at.date_naive()),
        _ => return None,
    };
    Some(value)
}

/// Date-only part of a timestamp value
pub(crate) fn date_of(value: &Value) -> Result<Value, StorageError> {
    if let Value::ChronoDate(_) = value {
        return Ok(value.clone());
    }
    instant(value)
        .map(|at| Value::from(at.date_naive()))
        .ok_or_else(|| StorageError::invalid(format!("date_of needs a timestamp, got {value:?}")))
}

pub(crate) fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::Json(None)
            | Value::ChronoDate(None)
            | Value::ChronoTime(None)
            | Value::ChronoDateTime(None)
            | Value::ChronoDateTimeUtc(None)
            | Value::ChronoDateTimeLocal(None)
            | Value::ChronoDateTimeWithTimeZone(None)
            | Value::Uuid(None)
            | Value::Decimal(None)
    )
}

fn typed_null(template: &Value) -> Option<Value> {
    let value = match template {
        Value::Bool(_) => Value::Bool(None),
        Value::TinyInt(_) => Value::TinyInt(None),
        Value::SmallInt(_) => Value::SmallInt(None),
        Value::Int(_) => Value::Int(None),
        Value::BigInt(_) => Value::BigInt(None),
        Value::TinyUnsigned(_) => Value::TinyUnsigned(None),
        Value::SmallUnsigned(_) => Value::SmallUnsigned(None),
        Value::Unsigned(_) => Value::Unsigned(None),
        Value::BigUnsigned(_) => Value::BigUnsigned(None),
        Value::Float(_) => Value::Float(None),
        Value::Double(_) => Value::Double(None),
        Value::String(_) => Value::String(None),
        Value::ChronoDate(_) => Value::ChronoDate(None),
        Value::ChronoDateTime(_) => Value::ChronoDateTime(None),
        Value::ChronoDateTimeUtc(_) => Value::ChronoDateTimeUtc(None),
        Value::ChronoDateTimeWithTimeZone(_) => Value::ChronoDateTimeWithTimeZone(None),
        other if is_null(other) => other.clone(),
        _ => return None,
    };
    Some(value)
}

/// Convert `value` to the variant of `template`, or `None` if the two are
/// not compatible. Integer narrowing is range checked.
pub(crate) fn coerce(value: Value, template: &Value) -> Option<Value> {
    if discriminant(&value) == discriminant(template) {
        return Some(value);
    }
    if is_null(&value) {
        return typed_null(template);
    }
    if let Some(n) = number(&value) {
        return from_number(n, template);
    }
    if let Some(at) = instant(&value) {
        return from_instant(at, template);
    }
    None
}

fn mismatch<C: IdenStatic>(column: C, template: &Value) -> StorageError {
    StorageError::invalid(format!(
        "value is not assignable to column `{}` ({template:?})",
        column.as_str()
    ))
}

/// Convert `value` to the variant `column` holds in `template`, then check
/// that the field accepts it. Catches what the variant alone cannot tell,
/// such as a string that names no variant of an `ActiveEnum`.
fn convert<E: StorageEntity>(
    template: &E::Model,
    column: E::Column,
    value: Value,
) -> Result<Value, StorageError> {
    let current = template.get(column);
    let coerced = coerce(value, &current).ok_or_else(|| mismatch(column, &current))?;
    if is_null(&coerced) && !column.def().is_null() {
        return Err(StorageError::invalid(format!(
            "column `{}` is not nullable",
            column.as_str()
        )));
    }

    let mut check = <E::ActiveModel as ActiveModelTrait>::default();
    check.try_set(column, coerced.clone()).map_err(|e| {
        StorageError::invalid(format!(
            "value is not assignable to column `{}`: {e}",
            column.as_str()
        ))
    })?;
    Ok(coerced)
}

/// Convert a constant for `column`, checked against the field of a blank model
pub(crate) fn coerce_for_column<E: StorageEntity>(
    column: E::Column,
    value: Value,
) -> Result<Value, StorageError> {
    convert::<E>(&E::Model::default(), column, value)
}

/// Write `value` into `column` of `model`, converted to the field's type
pub(crate) fn assign<E: StorageEntity>(
    model: &mut E::Model,
    column: E::Column,
    value: Value,
) -> Result<(), StorageError> {
    let coerced = convert::<E>(model, column, value)?;
    model.set(column, coerced);
    Ok(())
}

fn integer(value: &Value) -> Option<i64> {
    match number(value)? {
        Number::Int(v) => <i64 as TryFrom<i128>>::try_from(v).ok(),
        Number::Float(_) => None,
    }
}

/// Identity of a model, read through its identity column
pub(crate) fn identity_of<E: StorageEntity>(model: &E::Model) -> Result<i64, StorageError> {
    let value = model.get(E::ID);
    integer(&value).ok_or_else(|| {
        StorageError::invalid(format!(
            "identity column `{}` does not hold an integer: {value:?}",
            E::ID.as_str()
        ))
    })
}

/// Store-assigned identity written back into a fresh model
pub(crate) fn set_identity<E: StorageEntity>(
    model: &mut E::Model,
    id: i64,
) -> Result<(), StorageError> {
    assign::<E>(model, E::ID, Value::from(id))
}

/// Integer held by a value, if any
pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    integer(value)
}
