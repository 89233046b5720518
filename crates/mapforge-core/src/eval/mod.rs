//! In-memory evaluation of expression graphs.
//!
//! Compile-time checks guarantee shapes line up, so the only faults left here
//! are data-dependent ones: reading through an unguarded absent value,
//! dividing by zero, overflowing an integer.

mod compare;
#[cfg(test)]
mod tests;

use chrono::{Datelike, Timelike};
use smallvec::SmallVec;

pub use compare::{compare_values, values_equal};

use crate::coerce::coerce_value;
use crate::error::EvalError;
use crate::expr::{BinaryOp, Expr, Lambda, Method, Param, TypedLambda, UnaryOp};
use crate::types::ValueType;
use crate::value::{Record, Value};

/// Parameter bindings for one evaluation.
///
/// Later bindings shadow earlier ones with the same parameter.
#[derive(Debug, Clone, Default)]
pub struct Env<'a> {
    bindings: SmallVec<[(&'a Param, &'a Value); 2]>,
}

impl<'a> Env<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, param: &'a Param, value: &'a Value) -> Self {
        self.bindings.push((param, value));
        self
    }

    pub fn lookup(&self, param: &Param) -> Option<&'a Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| *p == param)
            .map(|(_, v)| *v)
    }
}

/// Evaluates an expression in the given environment.
pub fn eval(expr: &Expr, env: &Env) -> Result<Value, EvalError> {
    match expr {
        Expr::Param(param) => env
            .lookup(param)
            .cloned()
            .ok_or_else(|| EvalError::UnboundParameter(param.name.to_string())),

        Expr::Literal { value, .. } => Ok(value.clone()),

        Expr::Member { target, member, .. } => {
            let target = eval(target, env)?;
            if target.is_null() {
                return Err(EvalError::NullReference {
                    member: member.to_string(),
                });
            }
            member_of(&target, member)
        }

        Expr::Guarded { target, member, .. } => {
            let target = eval(target, env)?;
            if target.is_null() {
                return Ok(Value::Null);
            }
            member_of(&target, member)
        }

        Expr::Unary(op, inner) => {
            let value = eval(inner, env)?;
            match op {
                UnaryOp::Not => match value {
                    Value::Null => Ok(Value::Null),
                    other => Ok(Value::Bool(!truthy(&other)?)),
                },
                UnaryOp::Negate => negate(value),
            }
        }

        Expr::Binary(op, left, right) => {
            let left = eval(left, env)?;
            let right = eval(right, env)?;
            if op.is_comparison() {
                compare(*op, &left, &right).map(Value::Bool)
            } else {
                arithmetic(*op, left, right)
            }
        }

        Expr::And(left, right) => {
            if !truthy(&eval(left, env)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&eval(right, env)?)?))
        }

        Expr::Or(left, right) => {
            if truthy(&eval(left, env)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&eval(right, env)?)?))
        }

        Expr::Call {
            method,
            target,
            args,
        } => {
            let target = eval(target, env)?;
            let args = args
                .iter()
                .map(|a| eval(a, env))
                .collect::<Result<Vec<_>, _>>()?;
            call(*method, &target, &args).map(Value::Bool)
        }

        Expr::Convert { expr, value_type } => convert(eval(expr, env)?, value_type),

        Expr::If {
            cond,
            then_expr,
            else_expr,
        } => {
            if truthy(&eval(cond, env)?)? {
                eval(then_expr, env)
            } else {
                eval(else_expr, env)
            }
        }

        Expr::New { record_type, args } => {
            let args = args
                .iter()
                .map(|a| eval(a, env))
                .collect::<Result<Vec<_>, _>>()?;
            record_type.instantiate(args).map(Value::Record)
        }

        Expr::MemberInit { new, bindings } => {
            let mut record = match eval(new, env)? {
                Value::Record(record) => record,
                other => {
                    return Err(EvalError::InvalidOperand(format!(
                        "cannot initialise members of {}",
                        other.type_name()
                    )))
                }
            };
            for (member, expr) in bindings {
                let value = eval(expr, env)?;
                if !record.set(member, value) {
                    return Err(EvalError::MissingMember {
                        record: record.record_type().name().to_string(),
                        member: member.to_string(),
                    });
                }
            }
            Ok(Value::Record(record))
        }

        Expr::Lambda(_) => Err(EvalError::InvalidOperand(
            "a lambda is not a value".to_string(),
        )),
    }
}

/// Absent is false in boolean position.
fn truthy(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(EvalError::InvalidOperand(format!(
            "expected Boolean, got {}",
            other.type_name()
        ))),
    }
}

fn member_of(target: &Value, member: &str) -> Result<Value, EvalError> {
    let found = match target {
        Value::Record(record) => {
            return record
                .get(member)
                .cloned()
                .ok_or_else(|| EvalError::MissingMember {
                    record: record.record_type().name().to_string(),
                    member: member.to_string(),
                })
        }
        Value::String(s) if member == "Length" => {
            Some(Value::I32(to_i32(s.chars().count() as i64)?))
        }
        Value::List(items) if member == "Count" => Some(Value::I32(to_i32(items.len() as i64)?)),
        Value::Date(d) => match member {
            "Year" => Some(Value::I32(d.year())),
            "Month" => Some(Value::I32(d.month() as i32)),
            "Day" => Some(Value::I32(d.day() as i32)),
            "DayOfYear" => Some(Value::I32(d.ordinal() as i32)),
            _ => None,
        },
        Value::DateTime(dt) => match member {
            "Year" => Some(Value::I32(dt.year())),
            "Month" => Some(Value::I32(dt.month() as i32)),
            "Day" => Some(Value::I32(dt.day() as i32)),
            "Hour" => Some(Value::I32(dt.hour() as i32)),
            "Minute" => Some(Value::I32(dt.minute() as i32)),
            "Second" => Some(Value::I32(dt.second() as i32)),
            "Date" => Some(Value::Date(dt.date())),
            _ => None,
        },
        Value::Duration(d) => match member {
            "Days" => Some(Value::I64(d.num_days())),
            "Hours" => Some(Value::I32((d.num_hours() % 24) as i32)),
            "Minutes" => Some(Value::I32((d.num_minutes() % 60) as i32)),
            "Seconds" => Some(Value::I32((d.num_seconds() % 60) as i32)),
            "TotalHours" => Some(Value::F64(d.num_milliseconds() as f64 / 3_600_000.0)),
            "TotalMinutes" => Some(Value::F64(d.num_milliseconds() as f64 / 60_000.0)),
            "TotalSeconds" => Some(Value::F64(d.num_milliseconds() as f64 / 1_000.0)),
            _ => None,
        },
        _ => None,
    };
    found.ok_or_else(|| EvalError::MissingMember {
        record: target.type_name(),
        member: member.to_string(),
    })
}

fn to_i32(value: i64) -> Result<i32, EvalError> {
    i32::try_from(value).map_err(|_| EvalError::Overflow)
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        BinaryOp::Eq => return Ok(values_equal(left, right)),
        BinaryOp::Ne => return Ok(!values_equal(left, right)),
        _ => {}
    }
    if left.is_null() || right.is_null() {
        return Ok(false);
    }
    let ordering = compare_values(left, right).ok_or_else(|| {
        EvalError::InvalidOperand(format!(
            "cannot order {} and {}",
            left.type_name(),
            right.type_name()
        ))
    })?;
    Ok(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    })
}

fn negate(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::I32(v) => v.checked_neg().map(Value::I32).ok_or(EvalError::Overflow),
        Value::I64(v) => v.checked_neg().map(Value::I64).ok_or(EvalError::Overflow),
        Value::F64(v) => Ok(Value::F64(-v)),
        Value::Duration(d) => Ok(Value::Duration(-d)),
        other => Err(EvalError::InvalidOperand(format!(
            "cannot negate {}",
            other.type_name()
        ))),
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    match (&left, &right) {
        (Value::I32(a), Value::I32(b)) => {
            return int_op(op, i64::from(*a), i64::from(*b)).and_then(|v| to_i32(v).map(Value::I32))
        }
        (Value::I32(_) | Value::I64(_), Value::I32(_) | Value::I64(_)) => {
            if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
                return int_op(op, a, b).map(Value::I64);
            }
        }
        _ => {}
    }
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        return float_op(op, a, b).map(Value::F64);
    }

    let result = match (op, &left, &right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => {
            Some(Value::string(format!("{}{}", a, b)))
        }
        (BinaryOp::Sub, Value::DateTime(a), Value::DateTime(b)) => {
            Some(Value::Duration(a.signed_duration_since(*b)))
        }
        (BinaryOp::Add, Value::DateTime(a), Value::Duration(d)) => {
            a.checked_add_signed(*d).map(Value::DateTime)
        }
        (BinaryOp::Sub, Value::DateTime(a), Value::Duration(d)) => {
            a.checked_sub_signed(*d).map(Value::DateTime)
        }
        (BinaryOp::Add, Value::Duration(a), Value::Duration(b)) => {
            a.checked_add(b).map(Value::Duration)
        }
        (BinaryOp::Sub, Value::Duration(a), Value::Duration(b)) => {
            a.checked_sub(b).map(Value::Duration)
        }
        _ => {
            return Err(EvalError::InvalidOperand(format!(
                "cannot apply `{}` to {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            )))
        }
    };
    result.ok_or(EvalError::Overflow)
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Result<i64, EvalError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Mod if b == 0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Mod => a.checked_rem(b),
        _ => None,
    };
    result.ok_or(EvalError::Overflow)
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<f64, EvalError> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::Mod => Ok(a % b),
        _ => Err(EvalError::InvalidOperand(format!(
            "`{}` is not arithmetic",
            op.symbol()
        ))),
    }
}

fn call(method: Method, target: &Value, args: &[Value]) -> Result<bool, EvalError> {
    let arg = |idx: usize| {
        args.get(idx).ok_or(EvalError::ArityMismatch {
            expected: idx + 1,
            found: args.len(),
        })
    };

    match method {
        Method::IsNullOrEmpty => Ok(match target {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }),
        Method::In => {
            let candidates = arg(0)?.as_list().ok_or_else(|| {
                EvalError::InvalidOperand("`In` expects a list argument".to_string())
            })?;
            Ok(candidates.iter().any(|c| values_equal(target, c)))
        }
        Method::Contains | Method::StartsWith | Method::EndsWith => {
            let needle = arg(0)?;
            match (target, needle) {
                (Value::Null, _) | (_, Value::Null) => Ok(false),
                (Value::String(s), Value::String(n)) => Ok(match method {
                    Method::Contains => s.contains(&**n),
                    Method::StartsWith => s.starts_with(&**n),
                    _ => s.ends_with(&**n),
                }),
                (Value::List(items), needle) if method == Method::Contains => {
                    Ok(items.iter().any(|item| values_equal(item, needle)))
                }
                _ => Err(EvalError::InvalidOperand(format!(
                    "`{}` does not apply to {}",
                    method.name(),
                    target.type_name()
                ))),
            }
        }
    }
}

/// Converts at runtime. An absent value converted to a value type yields
/// that type's default.
fn convert(value: Value, target: &ValueType) -> Result<Value, EvalError> {
    if value.is_null() {
        return Ok(if target.may_be_absent() {
            Value::Null
        } else {
            target.default_value()
        });
    }
    let narrowing = matches!(
        (&value, target.underlying()),
        (Value::I64(_), ValueType::I32)
    );
    coerce_value(value, target).map_err(|e| {
        if narrowing {
            EvalError::Overflow
        } else {
            EvalError::InvalidOperand(e.to_string())
        }
    })
}

impl Lambda {
    /// Evaluates the body with `args` bound to the parameters in order.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != self.params.len() {
            return Err(EvalError::ArityMismatch {
                expected: self.params.len(),
                found: args.len(),
            });
        }
        let env = self
            .params
            .iter()
            .zip(args)
            .fold(Env::new(), |env, (p, v)| env.bind(p, v));
        eval(&self.body, &env)
    }

    fn invoke_single(&self, input: &Value) -> Result<Value, EvalError> {
        match self.params.as_slice() {
            [param] => eval(&self.body, &Env::new().bind(param, input)),
            params => Err(EvalError::ArityMismatch {
                expected: params.len(),
                found: 1,
            }),
        }
    }
}

impl TypedLambda<bool> {
    /// Tests `input` against the predicate. An absent result is false.
    pub fn test(&self, input: &Value) -> Result<bool, EvalError> {
        truthy(&self.lambda().invoke_single(input)?)
    }
}

impl TypedLambda<Record> {
    /// Projects `input` into a new record.
    pub fn apply(&self, input: &Value) -> Result<Record, EvalError> {
        match self.lambda().invoke_single(input)? {
            Value::Record(record) => Ok(record),
            other => Err(EvalError::InvalidOperand(format!(
                "projection produced {}",
                other.type_name()
            ))),
        }
    }
}
