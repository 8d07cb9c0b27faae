//! Declarative setter specifications
//!
//! A setter describes a new row state in terms of the old one, e.g.
//! `count = count + 1`. It is plain data: nothing is evaluated until the
//! setter is compiled.
//!
//! ```ignore
//! use entity_storage::{current, val, Setter};
//!
//! let setter = Setter::<counter::Entity>::init()
//!     .set(counter::Column::Count, current(counter::Column::Count) + val(1));
//! ```

use sea_orm::{Condition, EntityTrait, IdenStatic, Value};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Arithmetic supported inside a value expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
        };
        f.write_str(symbol)
    }
}

/// Expression producing the new value of one field
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr<C> {
    /// Literal value
    Value(Value),
    /// Current value of a field of the row being written
    Current(C),
    /// Current time as supplied by the gateway's clock
    Now,
    /// Date-only part of a timestamp
    DateOf(Box<ValueExpr<C>>),
    /// Arithmetic over two expressions
    Binary {
        op: BinaryOp,
        lhs: Box<ValueExpr<C>>,
        rhs: Box<ValueExpr<C>>,
    },
}

impl<C> ValueExpr<C> {
    fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Date-only part of this expression
    pub fn date(self) -> Self {
        Self::DateOf(Box::new(self))
    }
}

impl<C> Add for ValueExpr<C> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Add, self, rhs)
    }
}

impl<C> Sub for ValueExpr<C> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Sub, self, rhs)
    }
}

impl<C> Mul for ValueExpr<C> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Mul, self, rhs)
    }
}

/// Literal value
pub fn val<C>(value: impl Into<Value>) -> ValueExpr<C> {
    ValueExpr::Value(value.into())
}

/// Current value of `column`
pub fn current<C>(column: C) -> ValueExpr<C> {
    ValueExpr::Current(column)
}

/// Clock time at the moment the setter is compiled
pub fn now<C>() -> ValueExpr<C> {
    ValueExpr::Now
}

/// One `field = expr` pair
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding<C> {
    pub column: C,
    pub expr: ValueExpr<C>,
}

impl<C: IdenStatic> FieldBinding<C> {
    pub fn new(column: C, expr: ValueExpr<C>) -> Self {
        Self { column, expr }
    }

    /// Column name as stored
    pub fn name(&self) -> &str {
        self.column.as_str()
    }
}

/// Shape of a setter body
#[derive(Debug, Clone)]
pub enum SetterShape<C> {
    /// Build a new row with the listed fields; the only compilable shape
    Init(Vec<FieldBinding<C>>),
    /// Return the row unchanged
    Identity,
    /// Choose between two setters per row
    Conditional {
        condition: Condition,
        then: Box<SetterShape<C>>,
        otherwise: Box<SetterShape<C>>,
    },
}

impl<C> SetterShape<C> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init(_) => "field initialization",
            Self::Identity => "identity",
            Self::Conditional { .. } => "conditional",
        }
    }
}

/// Setter specification over entity `E`
pub struct Setter<E: EntityTrait> {
    shape: SetterShape<E::Column>,
}

impl<E: EntityTrait> Setter<E> {
    /// Empty field initialization; add bindings with [`Setter::set`]
    pub fn init() -> Self {
        Self {
            shape: SetterShape::Init(Vec::new()),
        }
    }

    /// Setter returning the row unchanged
    pub fn identity() -> Self {
        Self {
            shape: SetterShape::Identity,
        }
    }

    /// Setter choosing between two setters per row
    pub fn conditional(condition: Condition, then: Self, otherwise: Self) -> Self {
        Self {
            shape: SetterShape::Conditional {
                condition,
                then: Box::new(then.shape),
                otherwise: Box::new(otherwise.shape),
            },
        }
    }

    /// Bind `column` to `expr`. On a non-initialization shape the binding is
    /// ignored; compilation rejects such setters anyway.
    pub fn set(mut self, column: E::Column, expr: ValueExpr<E::Column>) -> Self {
        if let SetterShape::Init(bindings) = &mut self.shape {
            bindings.push(FieldBinding { column, expr });
        }
        self
    }

    /// Bind `column` to a literal
    pub fn set_value(self, column: E::Column, value: impl Into<Value>) -> Self {
        self.set(column, val(value))
    }

    pub fn shape(&self) -> &SetterShape<E::Column> {
        &self.shape
    }

    pub fn into_shape(self) -> SetterShape<E::Column> {
        self.shape
    }

    /// Bindings of an initialization shape
    pub fn bindings(&self) -> Option<&[FieldBinding<E::Column>]> {
        match &self.shape {
            SetterShape::Init(bindings) => Some(bindings),
            _ => None,
        }
    }

    /// Whether `column` is bound explicitly
    pub fn binds(&self, column: E::Column) -> bool {
        self.bindings()
            .is_some_and(|bindings| bindings.iter().any(|b| b.column.as_str() == column.as_str()))
    }
}

impl<E: EntityTrait> Clone for Setter<E> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
        }
    }
}

impl<E: EntityTrait> fmt::Debug for Setter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("shape", &self.shape).finish()
    }
}
