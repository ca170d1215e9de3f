//! Operations: the units of work in the selection AST.
//!
//! Every operation implements one protocol: `transpile(context)` produces a
//! projection expression plus an ordered list of clauses. The clauses,
//! concatenated by the caller, cover the operation's contribution to the
//! statement; the projection is spliced into the parent's output map under
//! the owning field's alias. Transpilation is pure: a fixed AST and a fixed
//! context always produce the same output, and sibling state is never
//! touched.

use serde_json::Value;

use crate::cypher_generator::clause::{
    CallProcedureClause, CallSubqueryClause, Clause, MatchClause, ProjectionItem, ReturnClause,
    UnionClause, WithClause,
};
use crate::cypher_generator::expr::{
    CypherExpr, CypherLiteral, Operator, OperatorApplication, Param, Variable,
};
use crate::cypher_generator::pattern::{
    Direction, NodePattern, Pattern, RelationshipPattern,
};

use super::context::TranslationContext;
use super::errors::TranspileError;
use super::field::Field;
use super::filter::Filter;
use super::sort::SortAndPaginate;
use super::QueryNode;

/// Output of `transpile`: the expression to splice into the parent's
/// projection, and the clauses contributing to the statement block.
#[derive(Debug, Clone, PartialEq)]
pub struct Transpiled {
    pub projection: CypherExpr,
    pub clauses: Vec<Clause>,
}

/// How a nested operation correlates to its parent anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipLink {
    pub rel_type: String,
    pub direction: Direction,
    pub one_to_one: bool,
}

/// Anchor produced by a full-text index procedure instead of a MATCH.
#[derive(Debug, Clone, PartialEq)]
pub struct FulltextAnchor {
    pub index_name: String,
    pub phrase: Value,
}

/// One concrete target of a read: labels, selected fields, and the
/// predicates scoped to this target.
#[derive(Debug)]
pub struct ReadBranch {
    pub type_name: String,
    pub labels: Vec<String>,
    pub fields: Vec<Field>,
    pub filter: Option<Filter>,
    pub auth_filter: Option<Filter>,
}

impl ReadBranch {
    fn predicate(&self, anchor: &Variable) -> Option<CypherExpr> {
        let user = self.filter.as_ref().and_then(|f| f.transpile(anchor));
        let auth = self.auth_filter.as_ref().and_then(|f| f.transpile(anchor));
        match (user, auth) {
            (None, None) => None,
            (Some(expr), None) | (None, Some(expr)) => Some(expr),
            (Some(user), Some(auth)) => Some(CypherExpr::OperatorApplication(
                OperatorApplication {
                    operator: Operator::And,
                    operands: vec![user, auth],
                },
            )),
        }
    }
}

/// A read over a single concrete type, an interface, or a union. Composite
/// targets carry one branch per included member; a concrete target is a
/// single branch.
#[derive(Debug)]
pub struct ReadOperation {
    pub type_name: String,
    pub composite: bool,
    pub branches: Vec<ReadBranch>,
    pub via: Option<RelationshipLink>,
    pub sort: Option<SortAndPaginate>,
    pub fulltext: Option<FulltextAnchor>,
}

impl ReadOperation {
    pub fn transpile(&self, ctx: &TranslationContext) -> Result<Transpiled, TranspileError> {
        // A discriminator that matched no members contributes no concrete
        // branches: the operation compiles to an empty collection.
        if self.branches.is_empty() {
            log::debug!(
                "read on '{}' has no included branches, compiling to empty result",
                self.type_name
            );
            return Ok(Transpiled {
                projection: CypherExpr::List(vec![]),
                clauses: vec![],
            });
        }

        if self.branches.len() == 1 {
            let (mut clauses, projection) =
                self.transpile_branch(&self.branches[0], ctx, self.composite)?;
            // Pagination binds right after the anchor clause, ahead of the
            // field subqueries; its WITH carries only the anchor.
            if let Some(sort) = &self.sort {
                if !sort.is_empty() {
                    clauses.insert(1, sort.to_with(ctx.anchor()));
                }
            }
            return Ok(Transpiled {
                projection,
                clauses,
            });
        }

        // Composite with several included members: one UNION branch per
        // member, all projecting under the shared return variable.
        let mut branch_lists = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            let bctx = ctx.branch();
            let mut list = Vec::new();
            if self.via.is_some() {
                let parent = ctx
                    .parent()
                    .ok_or_else(|| TranspileError::MissingParentScope(self.type_name.clone()))?;
                list.push(Clause::With(WithClause::carry(parent.anchor().clone())));
            }
            let (clauses, projection) = self.transpile_branch(branch, &bctx, true)?;
            list.extend(clauses);
            list.push(Clause::Return(ReturnClause::single(
                ProjectionItem::as_var(projection, ctx.returned().clone()),
            )));
            branch_lists.push(list);
        }

        let mut clauses = vec![Clause::CallSubquery(CallSubqueryClause {
            imports: vec![],
            clauses: vec![Clause::Union(UnionClause {
                branches: branch_lists,
            })],
        })];
        if let Some(sort) = &self.sort {
            if !sort.is_empty() {
                clauses.push(sort.to_with(ctx.returned()));
            }
        }
        Ok(Transpiled {
            projection: CypherExpr::Variable(ctx.returned().clone()),
            clauses,
        })
    }

    /// Anchor clause plus projection for one concrete branch.
    fn transpile_branch(
        &self,
        branch: &ReadBranch,
        ctx: &TranslationContext,
        include_typename: bool,
    ) -> Result<(Vec<Clause>, CypherExpr), TranspileError> {
        if branch.fields.is_empty() && !include_typename {
            return Err(TranspileError::EmptySelection(branch.type_name.clone()));
        }

        let anchor = ctx.anchor();
        let mut clauses = vec![anchor_clause(
            self.via.as_ref(),
            self.fulltext.as_ref(),
            branch,
            ctx,
            &self.type_name,
        )?];

        let mut entries: Vec<(String, CypherExpr)> = Vec::with_capacity(branch.fields.len() + 1);
        if include_typename {
            entries.push((
                "__typename".to_string(),
                CypherExpr::Literal(CypherLiteral::String(branch.type_name.clone())),
            ));
        }
        for field in &branch.fields {
            match field {
                Field::Attribute(attribute) => {
                    entries.push((
                        attribute.alias.clone(),
                        CypherExpr::Property(anchor.property(&attribute.storage_name)),
                    ));
                }
                Field::Operation(operation_field) => {
                    clauses.extend(operation_field.get_subqueries(ctx)?);
                    entries.push(operation_field.projection_field()?);
                }
                Field::TypeName(type_name) => {
                    entries.push((
                        type_name.alias.clone(),
                        CypherExpr::Literal(CypherLiteral::String(branch.type_name.clone())),
                    ));
                }
            }
        }
        Ok((clauses, CypherExpr::MapLiteral(entries)))
    }
}

/// Build the clause binding a branch's anchor: a correlated hop off the
/// parent anchor, a full-text procedure call, or a plain MATCH.
fn anchor_clause(
    via: Option<&RelationshipLink>,
    fulltext: Option<&FulltextAnchor>,
    branch: &ReadBranch,
    ctx: &TranslationContext,
    type_name: &str,
) -> Result<Clause, TranspileError> {
    let anchor = ctx.anchor();

    if let Some(link) = via {
        let parent = ctx
            .parent()
            .ok_or_else(|| TranspileError::MissingParentScope(type_name.to_string()))?;
        let pattern = Pattern::hop(
            NodePattern::bound(parent.anchor().clone()),
            RelationshipPattern {
                variable: None,
                rel_type: link.rel_type.clone(),
                direction: link.direction,
            },
            NodePattern::new(anchor.clone(), branch.labels.clone()),
        );
        return Ok(Clause::Match(MatchClause {
            optional: false,
            pattern,
            where_clause: branch.predicate(anchor),
        }));
    }

    if let Some(fulltext) = fulltext {
        // The procedure yields untyped nodes; guard with label predicates.
        let mut guards: Vec<CypherExpr> = branch
            .labels
            .iter()
            .map(|label| CypherExpr::HasLabel {
                variable: anchor.clone(),
                label: label.clone(),
            })
            .collect();
        if let Some(predicate) = branch.predicate(anchor) {
            guards.push(predicate);
        }
        let where_clause = match guards.len() {
            0 => None,
            1 => guards.into_iter().next(),
            _ => Some(CypherExpr::OperatorApplication(OperatorApplication {
                operator: Operator::And,
                operands: guards,
            })),
        };
        return Ok(Clause::CallProcedure(CallProcedureClause {
            procedure: "db.index.fulltext.queryNodes".to_string(),
            args: vec![
                CypherExpr::Param(Param::new(Value::String(fulltext.index_name.clone()))),
                CypherExpr::Param(Param::new(fulltext.phrase.clone())),
            ],
            yields: vec![("node".to_string(), anchor.clone())],
            where_clause,
        }));
    }

    Ok(Clause::Match(MatchClause {
        optional: false,
        pattern: Pattern::node(NodePattern::new(anchor.clone(), branch.labels.clone())),
        where_clause: branch.predicate(anchor),
    }))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateFunction {
    Min,
    Max,
    Avg,
    Sum,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Sum => "sum",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateSelection {
    Count {
        alias: String,
    },
    Property {
        alias: String,
        storage_name: String,
        functions: Vec<AggregateFunction>,
    },
}

/// Aggregation over a single concrete target.
#[derive(Debug)]
pub struct AggregateOperation {
    pub type_name: String,
    pub labels: Vec<String>,
    pub via: Option<RelationshipLink>,
    pub filter: Option<Filter>,
    pub auth_filter: Option<Filter>,
    pub selections: Vec<AggregateSelection>,
}

impl AggregateOperation {
    pub fn transpile(&self, ctx: &TranslationContext) -> Result<Transpiled, TranspileError> {
        if self.selections.is_empty() {
            return Err(TranspileError::EmptySelection(self.type_name.clone()));
        }
        let branch = ReadBranch {
            type_name: self.type_name.clone(),
            labels: self.labels.clone(),
            fields: vec![],
            filter: self.filter.clone(),
            auth_filter: self.auth_filter.clone(),
        };
        let clauses = vec![anchor_clause(
            self.via.as_ref(),
            None,
            &branch,
            ctx,
            &self.type_name,
        )?];

        let anchor = ctx.anchor();
        let mut entries = Vec::with_capacity(self.selections.len());
        for selection in &self.selections {
            match selection {
                AggregateSelection::Count { alias } => entries.push((
                    alias.clone(),
                    CypherExpr::fn_call("count", vec![CypherExpr::Variable(anchor.clone())]),
                )),
                AggregateSelection::Property {
                    alias,
                    storage_name,
                    functions,
                } => {
                    let inner = functions
                        .iter()
                        .map(|function| {
                            (
                                function.name().to_string(),
                                CypherExpr::fn_call(
                                    function.name(),
                                    vec![CypherExpr::Property(anchor.property(storage_name))],
                                ),
                            )
                        })
                        .collect();
                    entries.push((alias.clone(), CypherExpr::MapLiteral(inner)));
                }
            }
        }
        Ok(Transpiled {
            projection: CypherExpr::MapLiteral(entries),
            clauses,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionEntry {
    Edges,
    TotalCount,
}

/// Connection-style composite: edges plus a total count over the matched
/// rows, entry order following the selection.
#[derive(Debug)]
pub struct ConnectionOperation {
    pub read: ReadOperation,
    pub entries: Vec<ConnectionEntry>,
}

impl ConnectionOperation {
    pub fn transpile(&self, ctx: &TranslationContext) -> Result<Transpiled, TranspileError> {
        if self.entries.is_empty() {
            return Err(TranspileError::EmptySelection(self.read.type_name.clone()));
        }

        // No included branches means no rows: nothing to collect or count.
        if self.read.branches.is_empty() {
            let entries = self
                .entries
                .iter()
                .map(|entry| match entry {
                    ConnectionEntry::Edges => {
                        ("edges".to_string(), CypherExpr::List(vec![]))
                    }
                    ConnectionEntry::TotalCount => (
                        "totalCount".to_string(),
                        CypherExpr::Literal(CypherLiteral::Integer(0)),
                    ),
                })
                .collect();
            return Ok(Transpiled {
                projection: CypherExpr::MapLiteral(entries),
                clauses: vec![],
            });
        }

        let inner = self.read.transpile(ctx)?;
        let count_subject = if self.read.branches.len() > 1 {
            ctx.returned().clone()
        } else {
            ctx.anchor().clone()
        };

        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match entry {
                ConnectionEntry::Edges => entries.push((
                    "edges".to_string(),
                    CypherExpr::fn_call(
                        "collect",
                        vec![CypherExpr::MapLiteral(vec![(
                            "node".to_string(),
                            inner.projection.clone(),
                        )])],
                    ),
                )),
                ConnectionEntry::TotalCount => entries.push((
                    "totalCount".to_string(),
                    CypherExpr::fn_call(
                        "count",
                        vec![CypherExpr::Variable(count_subject.clone())],
                    ),
                )),
            }
        }
        Ok(Transpiled {
            projection: CypherExpr::MapLiteral(entries),
            clauses: inner.clauses,
        })
    }
}

#[derive(Debug)]
pub enum Operation {
    Read(ReadOperation),
    Aggregate(AggregateOperation),
    Connection(ConnectionOperation),
}

impl Operation {
    pub fn transpile(&self, ctx: &TranslationContext) -> Result<Transpiled, TranspileError> {
        match self {
            Operation::Read(read) => read.transpile(ctx),
            Operation::Aggregate(aggregate) => aggregate.transpile(ctx),
            Operation::Connection(connection) => connection.transpile(ctx),
        }
    }

    pub fn via(&self) -> Option<&RelationshipLink> {
        match self {
            Operation::Read(read) => read.via.as_ref(),
            Operation::Aggregate(aggregate) => aggregate.via.as_ref(),
            Operation::Connection(connection) => connection.read.via.as_ref(),
        }
    }
}

fn read_children<'a>(read: &'a ReadOperation, children: &mut Vec<&'a dyn QueryNode>) {
    for branch in &read.branches {
        for field in &branch.fields {
            children.push(field);
        }
        if let Some(filter) = &branch.filter {
            children.push(filter);
        }
        if let Some(auth) = &branch.auth_filter {
            children.push(auth);
        }
    }
    if let Some(sort) = &read.sort {
        children.push(sort);
    }
}

impl QueryNode for Operation {
    fn children(&self) -> Vec<&dyn QueryNode> {
        let mut children: Vec<&dyn QueryNode> = Vec::new();
        match self {
            Operation::Read(read) => read_children(read, &mut children),
            Operation::Connection(connection) => read_children(&connection.read, &mut children),
            Operation::Aggregate(aggregate) => {
                if let Some(filter) = &aggregate.filter {
                    children.push(filter);
                }
                if let Some(auth) = &aggregate.auth_filter {
                    children.push(auth);
                }
            }
        }
        children
    }
}
