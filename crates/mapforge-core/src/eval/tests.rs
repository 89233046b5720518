//! Tests for expression evaluation.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use super::*;
use crate::expr::BooleanGraph;
use crate::path::resolve_expr;
use crate::types::RecordType;

fn person() -> Arc<RecordType> {
    RecordType::builder("Person")
        .member("Id", ValueType::I64)
        .member("Descr", ValueType::String)
        .member("Birthdate", ValueType::Date)
        .member("TimeSince", ValueType::Duration)
        .member("Score", ValueType::nullable(ValueType::I32))
        .build()
        .unwrap()
}

fn sample(person: &Arc<RecordType>) -> Value {
    Value::Record(
        Record::new(Arc::clone(person))
            .with("Id", 7i64)
            .with("Birthdate", NaiveDate::from_ymd_opt(1990, 5, 17).unwrap())
            .with("TimeSince", Duration::hours(26)),
    )
}

#[test]
fn test_member_access() {
    let person = person();
    let x = Param::new("x", ValueType::record(&person));
    let input = sample(&person);
    let env = Env::new().bind(&x, &input);

    let year = resolve_expr(&x, "Birthdate.Year").unwrap();
    assert_eq!(eval(&year, &env), Ok(Value::I32(1990)));

    let hours = resolve_expr(&x, "TimeSince.Hours").unwrap();
    assert_eq!(eval(&hours, &env), Ok(Value::I32(2)));

    let days = resolve_expr(&x, "TimeSince.Days").unwrap();
    assert_eq!(eval(&days, &env), Ok(Value::I64(1)));
}

#[test]
fn test_guarded_access_propagates_absence() {
    let person = person();
    let x = Param::new("x", ValueType::record(&person));
    let input = sample(&person);
    let env = Env::new().bind(&x, &input);

    let length = resolve_expr(&x, "Descr.Length").unwrap();
    assert_eq!(eval(&length, &env), Ok(Value::Null));

    let unguarded = Expr::member(resolve_expr(&x, "Descr").unwrap(), "Length").unwrap();
    assert_eq!(
        eval(&unguarded, &env),
        Err(EvalError::NullReference {
            member: "Length".to_string()
        })
    );

    let with_descr = Value::Record(
        input
            .as_record()
            .unwrap()
            .clone()
            .with("Descr", "héllo"),
    );
    let env = Env::new().bind(&x, &with_descr);
    assert_eq!(eval(&length, &env), Ok(Value::I32(5)));
}

#[test]
fn test_lifted_comparisons() {
    let score = Expr::null(ValueType::I32);
    let null_eq = Expr::eq(score.clone(), Expr::null(ValueType::I32));
    let null_gt = Expr::gt(score, Expr::int(1));

    let env = Env::new();
    assert_eq!(eval(&null_eq, &env), Ok(Value::Bool(true)));
    assert_eq!(eval(&null_gt, &env), Ok(Value::Bool(false)));
    assert_eq!(
        eval(&Expr::lt(Expr::int(1), Expr::long(2)), &env),
        Ok(Value::Bool(true))
    );
}

#[test]
fn test_short_circuit() {
    let boom = Expr::gt(Expr::int(1) / Expr::int(0), Expr::int(0));
    let env = Env::new();

    let and = Expr::and(Expr::bool(false), boom.clone());
    assert_eq!(eval(&and, &env), Ok(Value::Bool(false)));

    let or = Expr::or(Expr::bool(true), boom.clone());
    assert_eq!(eval(&or, &env), Ok(Value::Bool(true)));

    assert_eq!(eval(&boom, &env), Err(EvalError::DivisionByZero));
}

#[test]
fn test_arithmetic() {
    let env = Env::new();
    assert_eq!(eval(&(Expr::int(2) + Expr::long(3)), &env), Ok(Value::I64(5)));
    assert_eq!(
        eval(&(Expr::int(i32::MAX) + Expr::int(1)), &env),
        Err(EvalError::Overflow)
    );
    assert_eq!(eval(&Expr::modulo(Expr::int(7), Expr::int(4)), &env), Ok(Value::I32(3)));
    assert_eq!(eval(&-Expr::long(4), &env), Ok(Value::I64(-4)));
}

#[test]
fn test_string_methods() {
    let env = Env::new();
    let starts = Expr::call(
        Method::StartsWith,
        Expr::string("mapping"),
        vec![Expr::string("map")],
    );
    assert_eq!(eval(&starts, &env), Ok(Value::Bool(true)));

    let absent = Expr::call(
        Method::Contains,
        Expr::null(ValueType::String),
        vec![Expr::string("a")],
    );
    assert_eq!(eval(&absent, &env), Ok(Value::Bool(false)));

    let empty = Expr::call(Method::IsNullOrEmpty, Expr::string(""), Vec::new());
    assert_eq!(eval(&empty, &env), Ok(Value::Bool(true)));

    let within = Expr::call(
        Method::In,
        Expr::int(2),
        vec![Expr::literal(
            Value::from(vec![1, 2, 3]),
            ValueType::list(ValueType::I32),
        )],
    );
    assert_eq!(eval(&within, &env), Ok(Value::Bool(true)));
}

#[test]
fn test_convert_absent_to_default() {
    let env = Env::new();
    let unwrap = Expr::convert(Expr::null(ValueType::I32), ValueType::I32);
    assert_eq!(eval(&unwrap, &env), Ok(Value::I32(0)));

    let widen = Expr::convert(Expr::int(3), ValueType::F64);
    assert_eq!(eval(&widen, &env), Ok(Value::F64(3.0)));
}

#[test]
fn test_new_and_member_init() {
    let pair = RecordType::builder("Pair")
        .member("Left", ValueType::I32)
        .member("Right", ValueType::String)
        .constructor_param("Left")
        .build()
        .unwrap();

    let expr = Expr::member_init(
        Expr::new_record(&pair, vec![Expr::int(1)]),
        vec![("Right".into(), Expr::string("one"))],
    );
    let value = eval(&expr, &Env::new()).unwrap();
    let record = value.as_record().unwrap();
    assert_eq!(record.get("Left"), Some(&Value::I32(1)));
    assert_eq!(record.get("Right"), Some(&Value::from("one")));
}

#[test]
fn test_unbound_parameter() {
    let x = Expr::param("x", ValueType::I32);
    assert_eq!(
        eval(&x, &Env::new()),
        Err(EvalError::UnboundParameter("x".to_string()))
    );
}

#[test]
fn test_typed_graphs() {
    let person = person();
    let x = Param::new("x", ValueType::record(&person));
    let body = Expr::gt(resolve_expr(&x, "Id").unwrap(), Expr::long(5));
    let graph = BooleanGraph::new(Lambda::single(x.clone(), body)).unwrap();

    assert_eq!(graph.test(&sample(&person)), Ok(true));
    assert_eq!(
        graph.lambda().invoke(&[]),
        Err(EvalError::ArityMismatch {
            expected: 1,
            found: 0
        })
    );
}
