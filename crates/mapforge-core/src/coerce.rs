//! Type coercion for graph nodes and literal values.
//!
//! Allowed conversions:
//! - identity
//! - numeric widening `I32 -> I64 -> F64`
//! - wrapping a value type into its nullable form, and unwrapping it again
//!   (an absent value unwraps to the type's default)
//! - `Date -> DateTime` at midnight
//!
//! Literal values additionally narrow integers that fit and parse ISO dates
//! from strings. Everything else is a [`TypeMismatch`].

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::TypeMismatch;
use crate::expr::Expr;
use crate::types::ValueType;
use crate::value::Value;

/// Returns true if a value of `from` converts implicitly to `to`.
pub fn is_implicit(from: &ValueType, to: &ValueType) -> bool {
    let (from, to) = (from.underlying(), to.underlying());
    if from == to {
        return true;
    }
    match (from.numeric_rank(), to.numeric_rank()) {
        (Some(f), Some(t)) => f <= t,
        _ => matches!((from, to), (ValueType::Date, ValueType::DateTime)),
    }
}

/// Coerces a graph node to `target`, inserting a `Convert` node if needed.
///
/// Literal nodes are folded: the literal value itself is converted, so the
/// resulting graph carries `1` rather than `Convert(1, Int64)`.
pub fn coerce(expr: Expr, target: &ValueType) -> Result<Expr, TypeMismatch> {
    let source = expr.value_type();
    if source == *target {
        return Ok(expr);
    }

    if let Expr::Literal { value, .. } = expr {
        let value = coerce_value(value, target)?;
        return Ok(Expr::literal(value, target.clone()));
    }

    if !is_implicit(&source, target) {
        return Err(TypeMismatch::new(target, &source));
    }
    Ok(Expr::convert(expr, target.clone()))
}

/// Converts a literal value to `target`.
pub fn coerce_value(value: Value, target: &ValueType) -> Result<Value, TypeMismatch> {
    let mismatch = |value: &Value| TypeMismatch::new(target, value.type_name());

    if value.is_null() {
        return if target.may_be_absent() {
            Ok(Value::Null)
        } else {
            Err(mismatch(&value))
        };
    }

    let converted = match (&value, target.underlying()) {
        (Value::Bool(_), ValueType::Bool)
        | (Value::I32(_), ValueType::I32)
        | (Value::I64(_), ValueType::I64)
        | (Value::F64(_), ValueType::F64)
        | (Value::String(_), ValueType::String)
        | (Value::Date(_), ValueType::Date)
        | (Value::DateTime(_), ValueType::DateTime)
        | (Value::Duration(_), ValueType::Duration) => Some(value.clone()),

        (Value::I32(v), ValueType::I64) => Some(Value::I64(i64::from(*v))),
        (Value::I32(v), ValueType::F64) => Some(Value::F64(f64::from(*v))),
        (Value::I64(v), ValueType::I32) => i32::try_from(*v).ok().map(Value::I32),
        (Value::I64(v), ValueType::F64) => Some(Value::F64(*v as f64)),

        (Value::Date(d), ValueType::DateTime) => d.and_hms_opt(0, 0, 0).map(Value::DateTime),
        (Value::String(s), ValueType::Date) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Value::Date)
        }
        (Value::String(s), ValueType::DateTime) => {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(Value::DateTime)
        }

        (Value::List(items), ValueType::List(element)) => {
            let items = items
                .iter()
                .cloned()
                .map(|item| coerce_value(item, element))
                .collect::<Result<Vec<_>, _>>()?;
            Some(Value::List(items))
        }

        (Value::Record(r), ValueType::Record(t)) if r.record_type() == t => Some(value.clone()),

        _ => None,
    };

    converted.ok_or_else(|| mismatch(&value))
}
