//! Fluent construction of predicate trees.

use std::sync::Arc;

use mapforge_core::{RecordType, Value};

use super::{Combinator, Condition, ConditionNode, Group, Operator, PredicateTree};

/// Builds a [`PredicateTree`] by chaining conditions.
///
/// Each `and`/`or` combines its condition with the whole tree accumulated so
/// far, so `has(a).or(b).and(c)` means `(a || b) && c`.
#[derive(Debug, Clone)]
pub struct PredicateBuilder {
    source: Arc<RecordType>,
    root: Option<ConditionNode>,
}

impl PredicateBuilder {
    pub fn new(source: &Arc<RecordType>) -> Self {
        Self {
            source: Arc::clone(source),
            root: None,
        }
    }

    /// Starts the tree with a condition. On a non-empty builder this is `and`.
    pub fn has(self, path: impl Into<String>, operator: Operator, operand: impl Into<Value>) -> Self {
        self.and(path, operator, operand)
    }

    pub fn and(self, path: impl Into<String>, operator: Operator, operand: impl Into<Value>) -> Self {
        let leaf = ConditionNode::Leaf(Condition::new(path, operator, operand));
        self.combine(Combinator::And, leaf)
    }

    pub fn or(self, path: impl Into<String>, operator: Operator, operand: impl Into<Value>) -> Self {
        let leaf = ConditionNode::Leaf(Condition::new(path, operator, operand));
        self.combine(Combinator::Or, leaf)
    }

    /// Appends a nested group built by `nested`, combined with `&&`.
    pub fn and_group(self, nested: impl FnOnce(PredicateBuilder) -> PredicateBuilder) -> Self {
        let group = self.nested(nested);
        self.combine(Combinator::And, group)
    }

    /// Appends a nested group built by `nested`, combined with `||`.
    pub fn or_group(self, nested: impl FnOnce(PredicateBuilder) -> PredicateBuilder) -> Self {
        let group = self.nested(nested);
        self.combine(Combinator::Or, group)
    }

    /// Negates everything accumulated so far.
    ///
    /// A single condition with a counterpart operator flips the operator;
    /// anything else becomes a negated group.
    pub fn negate(mut self) -> Self {
        self.root = self.root.map(|root| match root {
            ConditionNode::Leaf(mut condition) => match condition.operator.negation() {
                Some(negated) => {
                    condition.operator = negated;
                    ConditionNode::Leaf(condition)
                }
                None => ConditionNode::Group(Group {
                    combinator: Combinator::And,
                    negated: true,
                    children: vec![ConditionNode::Leaf(condition)],
                }),
            },
            ConditionNode::Group(mut group) => {
                group.negated = !group.negated;
                ConditionNode::Group(group)
            }
        });
        self
    }

    /// Finishes the tree. A builder without conditions yields an empty group,
    /// which fails to compile.
    pub fn build(self) -> PredicateTree {
        let root = self.root.unwrap_or_else(empty_group);
        PredicateTree::new(self.source, root)
    }

    fn nested(&self, nested: impl FnOnce(PredicateBuilder) -> PredicateBuilder) -> ConditionNode {
        nested(PredicateBuilder::new(&self.source))
            .root
            .unwrap_or_else(empty_group)
    }

    fn combine(mut self, combinator: Combinator, node: ConditionNode) -> Self {
        self.root = Some(match self.root.take() {
            None => node,
            Some(ConditionNode::Group(mut group))
                if group.combinator == combinator && !group.negated && !group.children.is_empty() =>
            {
                group.children.push(node);
                ConditionNode::Group(group)
            }
            Some(accumulated) => ConditionNode::Group(Group {
                combinator,
                negated: false,
                children: vec![accumulated, node],
            }),
        });
        self
    }
}

fn empty_group() -> ConditionNode {
    ConditionNode::Group(Group {
        combinator: Combinator::And,
        negated: false,
        children: Vec::new(),
    })
}
