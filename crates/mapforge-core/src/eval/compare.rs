//! Value comparison for the evaluator.

use std::cmp::Ordering;

use crate::value::Value;

fn both_integers(a: &Value, b: &Value) -> Option<(i64, i64)> {
    match (a, b) {
        (Value::I32(_) | Value::I64(_), Value::I32(_) | Value::I64(_)) => {
            Some((a.as_i64()?, b.as_i64()?))
        }
        _ => None,
    }
}

fn both_numbers(a: &Value, b: &Value) -> Option<(f64, f64)> {
    match (a, b) {
        (
            Value::I32(_) | Value::I64(_) | Value::F64(_),
            Value::I32(_) | Value::I64(_) | Value::F64(_),
        ) => Some((a.as_f64()?, b.as_f64()?)),
        _ => None,
    }
}

/// Checks if two values are equal. Two absent values are equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if let Some((x, y)) = both_integers(a, b) {
        return x == y;
    }
    if let Some((x, y)) = both_numbers(a, b) {
        return (x - y).abs() < f64::EPSILON;
    }
    match (a, b) {
        (Value::Date(x), Value::DateTime(y)) | (Value::DateTime(y), Value::Date(x)) => {
            x.and_hms_opt(0, 0, 0).as_ref() == Some(y)
        }
        _ => a == b,
    }
}

/// Orders two values, or returns `None` if they are not comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let Some((x, y)) = both_integers(a, b) {
        return Some(x.cmp(&y));
    }
    if let Some((x, y)) = both_numbers(a, b) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Duration(x), Value::Duration(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
