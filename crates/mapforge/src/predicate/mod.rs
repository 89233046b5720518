//! Predicate trees and their compilation to boolean graphs.
//!
//! A tree is built incrementally with [`PredicateBuilder`]: every chained
//! `and`/`or` combines the new condition with everything accumulated so far.
//! There is no operator precedence; the compiled graph groups exactly the way
//! the calls were chained.
//!
//! ```
//! use mapforge::predicate::{Operator, PredicateBuilder};
//! use mapforge::Compiler;
//! use mapforge_core::{RecordType, ValueType};
//!
//! let item = RecordType::builder("Item")
//!     .member("A", ValueType::I32)
//!     .member("B", ValueType::I32)
//!     .member("C", ValueType::I32)
//!     .build()
//!     .unwrap();
//!
//! let tree = PredicateBuilder::new(&item)
//!     .has("A", Operator::Equals, 1)
//!     .or("B", Operator::Equals, 2)
//!     .and("C", Operator::Equals, 3)
//!     .build();
//!
//! let graph = Compiler::new().compile_predicate(&tree).unwrap();
//! assert_eq!(
//!     graph.to_string(),
//!     "x => (((x.A == 1) || (x.B == 2)) && (x.C == 3))"
//! );
//! ```

mod builder;
mod compile;
mod operator;

use std::sync::Arc;

use mapforge_core::{RecordType, Value};

pub use builder::PredicateBuilder;
pub use compile::compile;
pub use operator::{Combinator, Operator};

/// A single test: `path operator operand`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub path: String,
    pub operator: Operator,
    /// Ignored by operators that take no operand.
    pub operand: Value,
}

impl Condition {
    pub fn new(path: impl Into<String>, operator: Operator, operand: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            operator,
            operand: operand.into(),
        }
    }
}

/// Children combined left to right with one combinator, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    pub combinator: Combinator,
    pub negated: bool,
    pub children: Vec<ConditionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionNode {
    Leaf(Condition),
    Group(Group),
}

/// A condition tree bound to the record type it tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredicateTree {
    source: Arc<RecordType>,
    root: ConditionNode,
}

impl PredicateTree {
    pub fn new(source: Arc<RecordType>, root: ConditionNode) -> Self {
        Self { source, root }
    }

    pub fn source(&self) -> &Arc<RecordType> {
        &self.source
    }

    pub fn root(&self) -> &ConditionNode {
        &self.root
    }

    /// Number of leaf conditions in the tree.
    pub fn len(&self) -> usize {
        fn count(node: &ConditionNode) -> usize {
            match node {
                ConditionNode::Leaf(_) => 1,
                ConditionNode::Group(group) => group.children.iter().map(count).sum(),
            }
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
