//! Expression graphs over runtime-shaped records.
//!
//! Graphs are immutable trees of typed nodes. Every node reports its
//! [`value_type`](Expr::value_type), so compilers can check and coerce while
//! building, and nothing about shapes is left to be discovered at evaluation.

mod display;

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Neg, Not, Sub};
use std::sync::Arc;

use crate::error::{GraphError, PathError};
use crate::types::{RecordType, ValueType};
use crate::value::{Record, Value};

/// A named, typed reference to a graph input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: Arc<str>,
    pub value_type: ValueType,
}

impl Param {
    pub fn new(name: impl Into<Arc<str>>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Built-in methods a [`Expr::Call`] node can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `target.Contains(arg)` on strings.
    Contains,
    /// `target.StartsWith(arg)` on strings.
    StartsWith,
    /// `target.EndsWith(arg)` on strings.
    EndsWith,
    /// True if the string or list target is absent or empty.
    IsNullOrEmpty,
    /// True if the target equals any element of the list argument.
    In,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Contains => "Contains",
            Method::StartsWith => "StartsWith",
            Method::EndsWith => "EndsWith",
            Method::IsNullOrEmpty => "IsNullOrEmpty",
            Method::In => "In",
        }
    }
}

/// An expression graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Reference to a graph input.
    Param(Param),
    Literal {
        value: Value,
        value_type: ValueType,
    },
    /// Plain member access; the target must be present at runtime.
    Member {
        target: Box<Expr>,
        member: Arc<str>,
        value_type: ValueType,
    },
    /// Null-propagating member access: absent if the target is absent.
    Guarded {
        target: Box<Expr>,
        member: Arc<str>,
        value_type: ValueType,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Short-circuit conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit disjunction.
    Or(Box<Expr>, Box<Expr>),
    Call {
        method: Method,
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    Convert {
        expr: Box<Expr>,
        value_type: ValueType,
    },
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// Constructor invocation; `args` follow the constructor parameter order.
    New {
        record_type: Arc<RecordType>,
        args: Vec<Expr>,
    },
    /// Member assignments applied to a freshly constructed record.
    MemberInit {
        new: Box<Expr>,
        bindings: Vec<(Arc<str>, Expr)>,
    },
    Lambda(Lambda),
}

impl Expr {
    // Constructors for common expressions

    pub fn param(name: impl Into<Arc<str>>, value_type: ValueType) -> Self {
        Expr::Param(Param::new(name, value_type))
    }

    pub fn literal(value: Value, value_type: ValueType) -> Self {
        Expr::Literal { value, value_type }
    }

    pub fn int(value: i32) -> Self {
        Expr::literal(Value::I32(value), ValueType::I32)
    }

    pub fn long(value: i64) -> Self {
        Expr::literal(Value::I64(value), ValueType::I64)
    }

    pub fn bool(value: bool) -> Self {
        Expr::literal(Value::Bool(value), ValueType::Bool)
    }

    pub fn string(value: &str) -> Self {
        Expr::literal(Value::from(value), ValueType::String)
    }

    /// An absent value of the given type.
    pub fn null(value_type: ValueType) -> Self {
        Expr::literal(Value::Null, ValueType::nullable(value_type))
    }

    /// Plain member access, typed from the target's shape.
    pub fn member(target: Expr, member: &str) -> Result<Self, PathError> {
        let target_type = target.value_type();
        let value_type = member_type_of(&target_type, member)?;
        Ok(Expr::Member {
            target: Box::new(target),
            member: member.into(),
            value_type,
        })
    }

    /// Null-propagating member access; the result type is lifted to nullable.
    pub fn guarded(target: Expr, member: &str) -> Result<Self, PathError> {
        let target_type = target.value_type();
        let value_type = ValueType::nullable(member_type_of(&target_type, member)?);
        Ok(Expr::Guarded {
            target: Box::new(target),
            member: member.into(),
            value_type,
        })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Ne, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, left, right)
    }

    pub fn le(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Le, left, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Gt, left, right)
    }

    pub fn ge(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Ge, left, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Unary(UnaryOp::Not, Box::new(expr))
    }

    pub fn modulo(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Mod, left, right)
    }

    pub fn call(method: Method, target: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            method,
            target: Box::new(target),
            args,
        }
    }

    pub fn convert(expr: Expr, value_type: ValueType) -> Self {
        Expr::Convert {
            expr: Box::new(expr),
            value_type,
        }
    }

    pub fn if_then_else(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn new_record(record_type: &Arc<RecordType>, args: Vec<Expr>) -> Self {
        Expr::New {
            record_type: Arc::clone(record_type),
            args,
        }
    }

    pub fn member_init(new: Expr, bindings: Vec<(Arc<str>, Expr)>) -> Self {
        Expr::MemberInit {
            new: Box::new(new),
            bindings,
        }
    }

    /// The static type of the value this node produces.
    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::Param(p) => p.value_type.clone(),
            Expr::Literal { value_type, .. }
            | Expr::Member { value_type, .. }
            | Expr::Guarded { value_type, .. }
            | Expr::Convert { value_type, .. } => value_type.clone(),
            Expr::Unary(UnaryOp::Not, _) => ValueType::Bool,
            Expr::Unary(UnaryOp::Negate, inner) => inner.value_type(),
            Expr::Binary(op, left, right) => {
                if op.is_comparison() {
                    ValueType::Bool
                } else {
                    arithmetic_type(&left.value_type(), &right.value_type())
                }
            }
            Expr::And(..) | Expr::Or(..) | Expr::Call { .. } => ValueType::Bool,
            Expr::If {
                then_expr,
                else_expr,
                ..
            } => {
                let then_type = then_expr.value_type();
                if else_expr.value_type().may_be_absent() {
                    ValueType::nullable(then_type)
                } else {
                    then_type
                }
            }
            Expr::New { record_type, .. } => ValueType::record(record_type),
            Expr::MemberInit { new, .. } => new.value_type(),
            Expr::Lambda(lambda) => lambda.body.value_type(),
        }
    }

    /// Direct children of this node, in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Param(_) | Expr::Literal { .. } => Vec::new(),
            Expr::Member { target, .. } | Expr::Guarded { target, .. } => vec![&**target],
            Expr::Unary(_, inner) | Expr::Convert { expr: inner, .. } => vec![&**inner],
            Expr::Binary(_, left, right) | Expr::And(left, right) | Expr::Or(left, right) => {
                vec![&**left, &**right]
            }
            Expr::Call { target, args, .. } => {
                let mut children = vec![&**target];
                children.extend(args);
                children
            }
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => vec![&**cond, &**then_expr, &**else_expr],
            Expr::New { args, .. } => args.iter().collect(),
            Expr::MemberInit { new, bindings } => {
                let mut children = vec![&**new];
                children.extend(bindings.iter().map(|(_, e)| e));
                children
            }
            Expr::Lambda(lambda) => vec![&*lambda.body],
        }
    }

    /// Visits this node and all descendants in pre-order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Returns true if any node in the graph is a null-propagating access.
    pub fn contains_guard(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| found |= matches!(e, Expr::Guarded { .. }));
        found
    }
}

fn member_type_of(target_type: &ValueType, member: &str) -> Result<ValueType, PathError> {
    if !target_type.has_members() {
        return Err(PathError::NotNavigable {
            member: member.to_string(),
            value_type: target_type.to_string(),
        });
    }
    target_type
        .member_type(member)
        .ok_or_else(|| PathError::UnknownMember {
            member: member.to_string(),
            shape: target_type.to_string(),
        })
}

/// Result type of an arithmetic node: the wider numeric operand type, lifted
/// to nullable if either side may be absent.
fn arithmetic_type(left: &ValueType, right: &ValueType) -> ValueType {
    let widest = match (left.numeric_rank(), right.numeric_rank()) {
        (Some(l), Some(r)) if r > l => right.underlying().clone(),
        (Some(_), Some(_)) => left.underlying().clone(),
        _ => match (left.underlying(), right.underlying()) {
            (ValueType::DateTime, ValueType::DateTime) => ValueType::Duration,
            _ => left.underlying().clone(),
        },
    };
    if left.may_be_absent() || right.may_be_absent() {
        ValueType::nullable(widest)
    } else {
        widest
    }
}

/// A lambda without a statically known output type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Box<Expr>,
}

impl Lambda {
    pub fn new(params: Vec<Param>, body: Expr) -> Self {
        Self {
            params,
            body: Box::new(body),
        }
    }

    pub fn single(param: Param, body: Expr) -> Self {
        Self::new(vec![param], body)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn output_type(&self) -> ValueType {
        self.body.value_type()
    }
}

/// Marker types for [`TypedLambda`] outputs.
pub trait GraphOutput {
    /// Human-readable name of the output for diagnostics.
    const NAME: &'static str;

    fn accepts(value_type: &ValueType) -> bool;
}

impl GraphOutput for bool {
    const NAME: &'static str = "Boolean";

    fn accepts(value_type: &ValueType) -> bool {
        *value_type == ValueType::Bool
    }
}

impl GraphOutput for Record {
    const NAME: &'static str = "Record";

    fn accepts(value_type: &ValueType) -> bool {
        matches!(value_type, ValueType::Record(_))
    }
}

/// A lambda whose body type is checked against the output marker `R`.
pub struct TypedLambda<R> {
    lambda: Lambda,
    _output: PhantomData<fn() -> R>,
}

/// A compiled predicate: one record in, a boolean out.
pub type BooleanGraph = TypedLambda<bool>;

/// A compiled projection: one record in, one record out.
pub type ProjectionGraph = TypedLambda<Record>;

impl<R: GraphOutput> TypedLambda<R> {
    pub fn new(lambda: Lambda) -> Result<Self, GraphError> {
        let found = lambda.output_type();
        if !R::accepts(&found) {
            return Err(GraphError::OutputMismatch {
                expected: R::NAME.to_string(),
                found: found.to_string(),
            });
        }
        Ok(Self {
            lambda,
            _output: PhantomData,
        })
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    pub fn into_lambda(self) -> Lambda {
        self.lambda
    }

    pub fn params(&self) -> &[Param] {
        &self.lambda.params
    }

    pub fn body(&self) -> &Expr {
        &self.lambda.body
    }
}

impl<R> Clone for TypedLambda<R> {
    fn clone(&self) -> Self {
        Self {
            lambda: self.lambda.clone(),
            _output: PhantomData,
        }
    }
}

impl<R> fmt::Debug for TypedLambda<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedLambda").field(&self.lambda).finish()
    }
}

impl<R> PartialEq for TypedLambda<R> {
    fn eq(&self, other: &Self) -> bool {
        self.lambda == other.lambda
    }
}

impl<R> Eq for TypedLambda<R> {}

impl<R> fmt::Display for TypedLambda<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.lambda, f)
    }
}

// Implement std::ops traits for operator syntax

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        Expr::Unary(UnaryOp::Not, Box::new(self))
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::binary(BinaryOp::Div, self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Self::Output {
        Expr::Unary(UnaryOp::Negate, Box::new(self))
    }
}
