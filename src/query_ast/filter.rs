//! Boolean predicate trees over an operation's anchor.
//!
//! Filters are built by the translation factory against property storage
//! names and transpile themselves into Cypher expressions once an anchor
//! variable is known. Empty filter input produces no predicate at all; the
//! clause list must work with zero WHERE fragments.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cypher_generator::expr::{
    CypherExpr, CypherLiteral, Operator, OperatorApplication, Param, Variable,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    StartsWith,
    EndsWith,
    Contains,
}

impl CompareOp {
    fn operator(&self) -> Operator {
        match self {
            CompareOp::Eq => Operator::Equal,
            CompareOp::Neq => Operator::NotEqual,
            CompareOp::Lt => Operator::LessThan,
            CompareOp::Lte => Operator::LessThanEqual,
            CompareOp::Gt => Operator::GreaterThan,
            CompareOp::Gte => Operator::GreaterThanEqual,
            CompareOp::In => Operator::In,
            CompareOp::StartsWith => Operator::StartsWith,
            CompareOp::EndsWith => Operator::EndsWith,
            CompareOp::Contains => Operator::Contains,
        }
    }
}

/// A single comparison leaf: a dotted storage path off the anchor, an
/// operator, and an already-coerced literal operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub path: Vec<String>,
    pub operator: CompareOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Compare(Comparison),
    /// An always-failing predicate, used when an injected rule cannot be
    /// satisfied (e.g. a required claim is absent).
    Never,
}

impl Filter {
    /// Pure conjunction combinator: returns a new tree, never mutates
    /// either input in place.
    pub fn and_also(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut items) => {
                items.push(other);
                Filter::And(items)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Translate to a Cypher predicate against the given anchor. `None`
    /// means no predicate should be emitted.
    pub fn transpile(&self, anchor: &Variable) -> Option<CypherExpr> {
        match self {
            Filter::And(items) => combine(items, anchor, Operator::And),
            Filter::Or(items) => combine(items, anchor, Operator::Or),
            Filter::Not(inner) => inner.transpile(anchor).map(|expr| {
                CypherExpr::OperatorApplication(OperatorApplication {
                    operator: Operator::Not,
                    operands: vec![expr],
                })
            }),
            Filter::Never => Some(CypherExpr::Literal(CypherLiteral::Boolean(false))),
            Filter::Compare(cmp) => {
                let first = cmp.path.first()?;
                let mut property = anchor.property(first);
                for segment in &cmp.path[1..] {
                    property = property.property(segment);
                }
                let lhs = CypherExpr::Property(property);

                // Null comparisons become IS NULL / IS NOT NULL; a `$param`
                // bound to null would never match in Cypher.
                if cmp.value.is_null() {
                    let operator = match cmp.operator {
                        CompareOp::Eq => Operator::IsNull,
                        CompareOp::Neq => Operator::IsNotNull,
                        _ => return None,
                    };
                    return Some(CypherExpr::OperatorApplication(OperatorApplication {
                        operator,
                        operands: vec![lhs],
                    }));
                }

                Some(CypherExpr::OperatorApplication(OperatorApplication {
                    operator: cmp.operator.operator(),
                    operands: vec![lhs, CypherExpr::Param(Param::new(cmp.value.clone()))],
                }))
            }
        }
    }

    /// Structural equality: shape, paths and operators by `==`, literal
    /// operands by [`deep_equals`].
    pub fn structurally_equal(&self, other: &Filter) -> bool {
        match (self, other) {
            (Filter::And(a), Filter::And(b)) | (Filter::Or(a), Filter::Or(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| x.structurally_equal(y))
            }
            (Filter::Not(a), Filter::Not(b)) => a.structurally_equal(b),
            (Filter::Never, Filter::Never) => true,
            (Filter::Compare(a), Filter::Compare(b)) => {
                a.path == b.path && a.operator == b.operator && deep_equals(&a.value, &b.value)
            }
            _ => false,
        }
    }
}

fn combine(items: &[Filter], anchor: &Variable, operator: Operator) -> Option<CypherExpr> {
    let operands: Vec<CypherExpr> = items
        .iter()
        .filter_map(|item| item.transpile(anchor))
        .collect();
    match operands.len() {
        0 => None,
        1 => operands.into_iter().next(),
        _ => Some(CypherExpr::OperatorApplication(OperatorApplication {
            operator,
            operands,
        })),
    }
}

/// Deep structural equality over literal values.
///
/// Both sides must have the same runtime shape and key count; a missing or
/// null counterpart key means not equal; arrays are compared recursively in
/// order; scalar mismatch means not equal.
pub fn deep_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| deep_equals(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            if xs.len() != ys.len() {
                return false;
            }
            xs.iter().all(|(key, value)| match ys.get(key) {
                None | Some(Value::Null) => false,
                Some(counterpart) => deep_equals(value, counterpart),
            })
        }
        (Value::Array(_), _) | (_, Value::Array(_)) => false,
        (Value::Object(_), _) | (_, Value::Object(_)) => false,
        (x, y) => x == y,
    }
}
