//! Fields of a selection: plain attribute reads and nested operations.
//!
//! An operation field transpiles its operation exactly once, in a child
//! scope, and caches the resulting clauses and projection expression. The
//! projection can only be read after that transpilation happened; reading
//! it earlier is a protocol bug and fails loudly instead of emitting a
//! placeholder.

use std::cell::OnceCell;

use crate::cypher_generator::clause::{
    CallSubqueryClause, Clause, ProjectionItem, ReturnClause,
};
use crate::cypher_generator::expr::{CypherExpr, RunFirstColumn, Variable};

use super::context::TranslationContext;
use super::errors::TranspileError;
use super::operation::Operation;
use super::QueryNode;

/// Direct property projection off the enclosing anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeField {
    pub alias: String,
    pub storage_name: String,
}

#[derive(Debug, Clone, PartialEq)]
struct FieldArtifacts {
    projection: CypherExpr,
    clauses: Vec<Clause>,
}

/// A nested operation projected under an alias.
#[derive(Debug)]
pub struct OperationField {
    pub alias: String,
    pub operation: Operation,
    cache: OnceCell<FieldArtifacts>,
}

impl OperationField {
    pub fn new(alias: impl Into<String>, operation: Operation) -> Self {
        OperationField {
            alias: alias.into(),
            operation,
            cache: OnceCell::new(),
        }
    }

    /// Transpile the nested operation in a child scope of `ctx` and return
    /// the clauses to splice into the enclosing block. Idempotent: repeated
    /// calls replay the cached artifacts.
    pub fn get_subqueries(
        &self,
        ctx: &TranslationContext,
    ) -> Result<Vec<Clause>, TranspileError> {
        if let Some(artifacts) = self.cache.get() {
            return Ok(artifacts.clauses.clone());
        }
        let artifacts = self.transpile_into_artifacts(ctx)?;
        let clauses = artifacts.clauses.clone();
        // The cell was empty above and nothing else writes it.
        let _ = self.cache.set(artifacts);
        Ok(clauses)
    }

    /// The expression projecting this field's value, available only after
    /// [`OperationField::get_subqueries`] ran.
    pub fn projection_field(&self) -> Result<(String, CypherExpr), TranspileError> {
        let artifacts = self
            .cache
            .get()
            .ok_or_else(|| TranspileError::ProjectionBeforeTranspile(self.alias.clone()))?;
        Ok((self.alias.clone(), artifacts.projection.clone()))
    }

    fn transpile_into_artifacts(
        &self,
        ctx: &TranslationContext,
    ) -> Result<FieldArtifacts, TranspileError> {
        let child = ctx.child();
        let inner = self.operation.transpile(&child)?;

        match &self.operation {
            // Aggregates embed as a single expression; no clauses surface
            // into the enclosing block.
            Operation::Aggregate(_) => {
                let mut clauses = inner.clauses;
                clauses.push(Clause::Return(ReturnClause::single(ProjectionItem::bare(
                    inner.projection,
                ))));
                let bindings = if self.operation.via().is_some() {
                    vec![ctx.anchor().clone()]
                } else {
                    vec![]
                };
                Ok(FieldArtifacts {
                    projection: CypherExpr::RunFirstColumn(RunFirstColumn {
                        clauses,
                        bindings,
                        single: true,
                    }),
                    clauses: vec![],
                })
            }
            Operation::Read(read) => {
                if inner.clauses.is_empty() {
                    // Discriminated down to nothing; the projection already
                    // is the final (empty) value.
                    return Ok(FieldArtifacts {
                        projection: inner.projection,
                        clauses: vec![],
                    });
                }
                let one_to_one = read.via.as_ref().map(|link| link.one_to_one).unwrap_or(false);
                let result = Variable::new("var");
                let mut clauses = inner.clauses;
                let mut collected =
                    CypherExpr::fn_call("collect", vec![inner.projection]);
                if one_to_one {
                    collected = CypherExpr::fn_call("head", vec![collected]);
                }
                clauses.push(Clause::Return(ReturnClause::single(
                    ProjectionItem::as_var(collected, result.clone()),
                )));
                Ok(FieldArtifacts {
                    projection: CypherExpr::Variable(result.clone()),
                    clauses: vec![Clause::CallSubquery(CallSubqueryClause {
                        imports: vec![ctx.anchor().clone()],
                        clauses,
                    })],
                })
            }
            Operation::Connection(_) => {
                let result = Variable::new("var");
                let mut clauses = inner.clauses;
                clauses.push(Clause::Return(ReturnClause::single(
                    ProjectionItem::as_var(inner.projection, result.clone()),
                )));
                Ok(FieldArtifacts {
                    projection: CypherExpr::Variable(result.clone()),
                    clauses: vec![Clause::CallSubquery(CallSubqueryClause {
                        imports: vec![ctx.anchor().clone()],
                        clauses,
                    })],
                })
            }
        }
    }
}

/// Projects the branch's type name as a string literal.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNameField {
    pub alias: String,
}

#[derive(Debug)]
pub enum Field {
    Attribute(AttributeField),
    Operation(OperationField),
    TypeName(TypeNameField),
}

impl Field {
    pub fn attribute(alias: impl Into<String>, storage_name: impl Into<String>) -> Self {
        Field::Attribute(AttributeField {
            alias: alias.into(),
            storage_name: storage_name.into(),
        })
    }

    pub fn type_name(alias: impl Into<String>) -> Self {
        Field::TypeName(TypeNameField {
            alias: alias.into(),
        })
    }

    pub fn alias(&self) -> &str {
        match self {
            Field::Attribute(attribute) => &attribute.alias,
            Field::Operation(operation) => &operation.alias,
            Field::TypeName(type_name) => &type_name.alias,
        }
    }
}

impl QueryNode for Field {
    fn children(&self) -> Vec<&dyn QueryNode> {
        match self {
            Field::Attribute(_) | Field::TypeName(_) => vec![],
            Field::Operation(operation_field) => vec![&operation_field.operation],
        }
    }
}
