//! Selection AST.
//!
//! The nodes in this module describe WHAT a request selects (operations,
//! fields, filters, sort directives) independently of the Cypher text that
//! will carry it. Each operation turns itself into clauses and a projection
//! expression through `transpile`; the translator assembles those into a
//! full statement.

pub mod context;
pub mod field;
pub mod filter;
pub mod operation;
pub mod sort;

mod errors;

pub use context::TranslationContext;
pub use errors::TranspileError;
pub use field::{AttributeField, Field, OperationField, TypeNameField};
pub use filter::{deep_equals, CompareOp, Comparison, Filter};
pub use operation::{
    AggregateFunction, AggregateOperation, AggregateSelection, ConnectionEntry,
    ConnectionOperation, FulltextAnchor, Operation, ReadBranch, ReadOperation, RelationshipLink,
    Transpiled,
};
pub use sort::{SortAndPaginate, SortItem};

/// Homogeneous traversal over the selection tree.
pub trait QueryNode {
    fn children(&self) -> Vec<&dyn QueryNode>;
}

/// Depth-first pre-order walk, calling `visit` on every node.
pub fn walk<'a>(node: &'a dyn QueryNode, visit: &mut dyn FnMut(&'a dyn QueryNode)) {
    visit(node);
    for child in node.children() {
        walk(child, visit);
    }
}

impl QueryNode for Filter {
    fn children(&self) -> Vec<&dyn QueryNode> {
        match self {
            Filter::And(items) | Filter::Or(items) => {
                items.iter().map(|item| item as &dyn QueryNode).collect()
            }
            Filter::Not(inner) => vec![inner.as_ref()],
            Filter::Compare(_) | Filter::Never => vec![],
        }
    }
}

impl QueryNode for SortAndPaginate {
    fn children(&self) -> Vec<&dyn QueryNode> {
        vec![]
    }
}
