//! Sort and pagination directive.

use serde_json::json;

use crate::cypher_generator::clause::{Clause, OrderItem, WithClause};
use crate::cypher_generator::expr::{CypherExpr, Param, Variable};

#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    pub storage_name: String,
    pub descending: bool,
}

/// Ordering keys plus skip/limit bounds. Bounds render as parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortAndPaginate {
    pub items: Vec<SortItem>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl SortAndPaginate {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.skip.is_none() && self.limit.is_none()
    }

    /// Build the `WITH <subject> ORDER BY ... SKIP ... LIMIT ...` clause
    /// applying this directive to a bound row.
    pub fn to_with(&self, subject: &Variable) -> Clause {
        let mut with = WithClause::carry(subject.clone());
        with.order_by = self
            .items
            .iter()
            .map(|item| OrderItem {
                expression: CypherExpr::Property(subject.property(&item.storage_name)),
                descending: item.descending,
            })
            .collect();
        with.skip = self.skip.map(|n| CypherExpr::Param(Param::new(json!(n))));
        with.limit = self.limit.map(|n| CypherExpr::Param(Param::new(json!(n))));
        Clause::With(with)
    }
}
