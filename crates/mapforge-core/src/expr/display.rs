//! Textual rendering of expression graphs.
//!
//! The rendering is stable: two graphs render to the same text exactly when
//! they have the same structure, so tests can compare graphs as strings.

use std::fmt;

use super::{Expr, Lambda, Method, UnaryOp};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param(p) => f.write_str(&p.name),
            Expr::Literal { value, .. } => write!(f, "{}", value),
            Expr::Member { target, member, .. } => write!(f, "{}.{}", target, member),
            Expr::Guarded { target, member, .. } => write!(f, "{}?.{}", target, member),
            Expr::Unary(UnaryOp::Not, inner) => write!(f, "!{}", inner),
            Expr::Unary(UnaryOp::Negate, inner) => write!(f, "-{}", inner),
            Expr::Binary(op, left, right) => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::And(left, right) => write!(f, "({} && {})", left, right),
            Expr::Or(left, right) => write!(f, "({} || {})", left, right),
            Expr::Call {
                method: Method::IsNullOrEmpty,
                target,
                ..
            } => write!(f, "IsNullOrEmpty({})", target),
            Expr::Call {
                method: Method::In,
                target,
                args,
            } => {
                write!(f, "({} in ", target)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Call {
                method,
                target,
                args,
            } => {
                write!(f, "{}.{}(", target, method.name())?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Convert { expr, value_type } => write!(f, "Convert({}, {})", expr, value_type),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "({} ? {} : {})", cond, then_expr, else_expr),
            Expr::New { record_type, args } => {
                write!(f, "new {}(", record_type.name())?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::MemberInit { new, bindings } => {
                write!(f, "{} {{ ", new)?;
                for (i, (member, value)) in bindings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} = {}", member, value)?;
                }
                f.write_str(" }")
            }
            Expr::Lambda(lambda) => write!(f, "{}", lambda),
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params.as_slice() {
            [single] => write!(f, "{} => {}", single.name, self.body),
            params => {
                f.write_str("(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&p.name)?;
                }
                write!(f, ") => {}", self.body)
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
