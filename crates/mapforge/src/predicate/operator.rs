//! The closed set of condition operators.

use std::fmt;
use std::str::FromStr;

use mapforge_core::ValueType;
use serde::{Deserialize, Serialize};

/// A condition operator.
///
/// Each operator has one compilation rule in [`compile`](super::compile);
/// adding an operator means extending this enum and that rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    DoesNotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    IsNull,
    IsNotNull,
    IsNullOrEmpty,
    IsNotNullOrEmpty,
    Contains,
    StartsWith,
    EndsWith,
    In,
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Operator::Equals,
        Operator::DoesNotEqual,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::IsNullOrEmpty,
        Operator::IsNotNullOrEmpty,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::In,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operator::Equals => "Equals",
            Operator::DoesNotEqual => "DoesNotEqual",
            Operator::GreaterThan => "GreaterThan",
            Operator::GreaterThanOrEqual => "GreaterThanOrEqual",
            Operator::LessThan => "LessThan",
            Operator::LessThanOrEqual => "LessThanOrEqual",
            Operator::IsNull => "IsNull",
            Operator::IsNotNull => "IsNotNull",
            Operator::IsNullOrEmpty => "IsNullOrEmpty",
            Operator::IsNotNullOrEmpty => "IsNotNullOrEmpty",
            Operator::Contains => "Contains",
            Operator::StartsWith => "StartsWith",
            Operator::EndsWith => "EndsWith",
            Operator::In => "In",
        }
    }

    /// Returns false for the null and emptiness checks, which ignore their operand.
    pub fn takes_operand(self) -> bool {
        !matches!(
            self,
            Operator::IsNull
                | Operator::IsNotNull
                | Operator::IsNullOrEmpty
                | Operator::IsNotNullOrEmpty
        )
    }

    /// The operator testing the opposite condition, if there is one.
    ///
    /// Operators without a counterpart are negated by wrapping the compiled
    /// condition in a logical not.
    pub fn negation(self) -> Option<Operator> {
        match self {
            Operator::Equals => Some(Operator::DoesNotEqual),
            Operator::DoesNotEqual => Some(Operator::Equals),
            Operator::IsNull => Some(Operator::IsNotNull),
            Operator::IsNotNull => Some(Operator::IsNull),
            Operator::IsNullOrEmpty => Some(Operator::IsNotNullOrEmpty),
            Operator::IsNotNullOrEmpty => Some(Operator::IsNullOrEmpty),
            _ => None,
        }
    }

    /// Returns true if the operator can test a path of type `path_type`.
    ///
    /// `path_type` is the type of the lowered path, i.e. already lifted to
    /// nullable when the path is guarded.
    pub fn accepts(self, path_type: &ValueType) -> bool {
        match self {
            Operator::Equals | Operator::DoesNotEqual | Operator::In => true,
            Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThan
            | Operator::LessThanOrEqual => path_type.is_ordered(),
            Operator::IsNull | Operator::IsNotNull => path_type.may_be_absent(),
            Operator::IsNullOrEmpty | Operator::IsNotNullOrEmpty | Operator::Contains => matches!(
                path_type.underlying(),
                ValueType::String | ValueType::List(_)
            ),
            Operator::StartsWith | Operator::EndsWith => {
                *path_type.underlying() == ValueType::String
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operator: {}", s))
    }
}

/// How the children of a condition group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combinator {
    And,
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => f.write_str("And"),
            Combinator::Or => f.write_str("Or"),
        }
    }
}

impl FromStr for Combinator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" | "&&" => Ok(Combinator::And),
            "or" | "||" => Ok(Combinator::Or),
            _ => Err(format!("unknown combinator: {}", s)),
        }
    }
}
